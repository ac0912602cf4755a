//! [`PendingHeadersApi`] contains the endpoints through which a validating
//! authority pulls the backlog of staged headers.

use alloy_consensus::Header;
use alloy_primitives::B256;
use jsonrpsee::{
    core::{RpcResult, SubscriptionResult},
    proc_macros::rpc,
};

/// Using the proc_macro to generate the client and server code.
/// Default namespace separator is `_`.
#[rpc(client, server, namespace = "vestibule")]
pub trait PendingHeadersApi {
    /// Returns the staged headers from `from` up to the head.
    ///
    /// An unknown or zero `from` returns every staged header.
    #[method(name = "readHeaderSince")]
    async fn read_header_since(&self, from: B256) -> RpcResult<Vec<Header>>;

    /// Returns the hash of the most recently staged header.
    #[method(name = "pendingHead")]
    async fn pending_head(&self) -> RpcResult<Option<B256>>;

    /// Streams every header staged after the subscription is made.
    #[subscription(
        name = "subscribePendingHeaders" => "pendingHeader",
        unsubscribe = "unsubscribePendingHeaders",
        item = Header
    )]
    async fn subscribe_pending_headers(&self) -> SubscriptionResult;
}
