use jsonrpsee::{core::ClientError, types::ErrorObjectOwned};
use thiserror::Error;

/// Failures of a confirmation request.
///
/// Only [`ConfirmError::EmptyRequest`] is known to have never reached the
/// authority. Every other variant leaves the verdict unknown and must not be
/// read as [`Status::Invalid`](crate::Status::Invalid).
#[derive(Debug, Error)]
pub enum ConfirmError {
    /// The request carried no blocks and was not sent.
    #[error("empty request")]
    EmptyRequest,

    /// The call did not complete.
    #[error("transport failure: {0}")]
    Transport(#[source] ClientError),

    /// The authority answered with a JSON-RPC error.
    #[error("authority rejected request: {0}")]
    Rpc(ErrorObjectOwned),

    /// The authority answered, but not with one status per requested block.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The caller's deadline expired before the authority answered.
    #[error("confirmation timed out after {0} ms")]
    Timeout(u64),
}

impl ConfirmError {
    /// Returns `true` if the same request may succeed when sent again.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

impl From<ClientError> for ConfirmError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Call(err) => Self::Rpc(err),
            _ => Self::Transport(err),
        }
    }
}
