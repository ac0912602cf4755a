//! JSON-RPC surface of the pending header container.
//!
//! A validating authority pulls the staged backlog through
//! `vestibule_readHeaderSince` and follows new arrivals through the
//! `vestibule_subscribePendingHeaders` subscription.

mod jsonrpsee;
pub use jsonrpsee::{PendingHeadersApiClient, PendingHeadersApiServer};

mod server;
pub use server::PendingHeadersRpc;
