use crate::StagingActor;
use async_trait::async_trait;
use std::{io, net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::info;
use vestibule_rpc::PendingHeadersRpc;
use vestibule_storage::{KeyValueStore, PendingHeaderContainer};

/// Serves the pending header API until cancelled.
#[derive(Debug)]
pub struct RpcActor<DB> {
    socket: SocketAddr,
    container: Arc<PendingHeaderContainer<DB>>,
    cancel_token: CancellationToken,
}

impl<DB> RpcActor<DB>
where
    DB: KeyValueStore + 'static,
{
    /// Creates a new [`RpcActor`].
    pub const fn new(
        socket: SocketAddr,
        container: Arc<PendingHeaderContainer<DB>>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self { socket, container, cancel_token }
    }
}

#[async_trait]
impl<DB> StagingActor for RpcActor<DB>
where
    DB: KeyValueStore + 'static,
{
    type Error = io::Error;

    async fn start(self) -> Result<(), Self::Error> {
        let (addr, handle) = PendingHeadersRpc::new(self.container).launch(self.socket).await?;
        info!(target: "service::rpc", %addr, "Started pending header RPC actor");

        tokio::select! {
            _ = self.cancel_token.cancelled() => {
                info!(target: "service::rpc", "Cancellation requested, stopping RPC server");
                // Already stopped if this fails.
                let _ = handle.stop();
                handle.stopped().await;
            }
            _ = handle.clone().stopped() => {
                info!(target: "service::rpc", "RPC server stopped");
            }
        }

        Ok(())
    }
}
