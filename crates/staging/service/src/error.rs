//! Errors of the staging actors.

use thiserror::Error;
use vestibule_storage::ContainerError;

/// Fatal errors of the [`ForwarderActor`](crate::ForwarderActor).
///
/// Authority failures are not fatal. They are logged and the affected
/// blocks are asked about again.
#[derive(Debug, Error)]
pub enum ForwarderError {
    /// Reading the container failed.
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// The receiver of the verdicts was dropped.
    #[error("verdict receiver closed")]
    VerdictsClosed,
}
