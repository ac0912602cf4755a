//! Server-side implementation of the [`PendingHeadersApi`](crate::PendingHeadersApiServer).

use crate::PendingHeadersApiServer;
use alloy_consensus::Header;
use alloy_primitives::B256;
use async_trait::async_trait;
use jsonrpsee::{
    core::{RpcResult, SubscriptionResult},
    server::{PendingSubscriptionSink, ServerBuilder, ServerHandle, SubscriptionMessage},
    types::{ErrorObject, ErrorObjectOwned, error::ErrorCode},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, info, trace, warn};
use vestibule_storage::{ContainerError, KeyValueStore, PendingHeaderContainer};

/// Serves a [`PendingHeaderContainer`] over JSON-RPC.
#[derive(Debug)]
pub struct PendingHeadersRpc<DB> {
    container: Arc<PendingHeaderContainer<DB>>,
}

impl<DB> Clone for PendingHeadersRpc<DB> {
    fn clone(&self) -> Self {
        Self { container: Arc::clone(&self.container) }
    }
}

impl<DB> PendingHeadersRpc<DB>
where
    DB: KeyValueStore + 'static,
{
    /// Creates a new [`PendingHeadersRpc`] over `container`.
    pub const fn new(container: Arc<PendingHeaderContainer<DB>>) -> Self {
        Self { container }
    }

    /// Serves the API on `socket`. Returns the bound address and the server
    /// handle.
    pub async fn launch(self, socket: SocketAddr) -> std::io::Result<(SocketAddr, ServerHandle)> {
        let server = ServerBuilder::default().build(socket).await?;
        let addr = server.local_addr()?;
        info!(target: "staging::rpc", %addr, "Pending header RPC listening");
        Ok((addr, server.start(self.into_rpc())))
    }
}

fn internal_error(err: ContainerError) -> ErrorObjectOwned {
    warn!(target: "staging::rpc", %err, "Pending header container failed");
    ErrorObject::from(ErrorCode::InternalError)
}

#[async_trait]
impl<DB> PendingHeadersApiServer for PendingHeadersRpc<DB>
where
    DB: KeyValueStore + 'static,
{
    async fn read_header_since(&self, from: B256) -> RpcResult<Vec<Header>> {
        trace!(target: "staging::rpc", %from, "Received read_header_since request");
        self.container.read_header_since(from).map_err(internal_error)
    }

    async fn pending_head(&self) -> RpcResult<Option<B256>> {
        trace!(target: "staging::rpc", "Received pending_head request");
        self.container.head().map_err(internal_error)
    }

    async fn subscribe_pending_headers(
        &self,
        pending: PendingSubscriptionSink,
    ) -> SubscriptionResult {
        let mut headers = self.container.subscribe();
        let id = headers.id();
        let sink = pending.accept().await?;
        debug!(target: "staging::rpc", ?id, "Pending header subscription accepted");

        loop {
            tokio::select! {
                _ = sink.closed() => break,
                event = headers.recv() => {
                    let Some(event) = event else { break };
                    let message = SubscriptionMessage::new(
                        sink.method_name(),
                        sink.subscription_id(),
                        &event.header,
                    )?;
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
            }
        }

        self.container.unsubscribe(id);
        debug!(target: "staging::rpc", ?id, "Pending header subscription closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::{RpcModule, rpc_params};
    use vestibule_storage::MemoryDatabase;

    fn header(number: u64) -> Header {
        Header { number, ..Default::default() }
    }

    fn module() -> (Arc<PendingHeaderContainer>, RpcModule<PendingHeadersRpc<MemoryDatabase>>) {
        let container = Arc::new(PendingHeaderContainer::new());
        let module = PendingHeadersRpc::new(Arc::clone(&container)).into_rpc();
        (container, module)
    }

    #[tokio::test]
    async fn test_read_header_since_over_rpc() {
        let (container, module) = module();
        let headers: Vec<_> = (1..=3).map(header).collect();
        container.write_header_batch(headers.clone()).unwrap();

        let all: Vec<Header> =
            module.call("vestibule_readHeaderSince", rpc_params![B256::ZERO]).await.unwrap();
        assert_eq!(all, headers);

        let tail: Vec<Header> = module
            .call("vestibule_readHeaderSince", rpc_params![headers[1].hash_slow()])
            .await
            .unwrap();
        assert_eq!(tail, headers[1..].to_vec());

        let head: Option<B256> = module.call("vestibule_pendingHead", rpc_params![]).await.unwrap();
        assert_eq!(head, Some(headers[2].hash_slow()));
    }

    #[tokio::test]
    async fn test_empty_container_over_rpc() {
        let (_container, module) = module();
        let all: Vec<Header> = module
            .call("vestibule_readHeaderSince", rpc_params![B256::repeat_byte(7)])
            .await
            .unwrap();
        assert!(all.is_empty());

        let head: Option<B256> = module.call("vestibule_pendingHead", rpc_params![]).await.unwrap();
        assert_eq!(head, None);
    }

    #[tokio::test]
    async fn test_subscription_streams_new_headers() {
        let (container, module) = module();
        let mut sub = module
            .subscribe_unbounded("vestibule_subscribePendingHeaders", rpc_params![])
            .await
            .unwrap();
        assert_eq!(container.feed().subscriber_count(), 1);

        container.write_header(header(1)).unwrap();
        container.write_header(header(2)).unwrap();

        let (first, _) = sub.next::<Header>().await.unwrap().unwrap();
        let (second, _) = sub.next::<Header>().await.unwrap().unwrap();
        assert_eq!((first.number, second.number), (1, 2));
    }
}
