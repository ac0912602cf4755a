//! [StagingActor] trait.

use async_trait::async_trait;

/// A long running task of the staging service.
///
/// An actor owns its inputs, runs until its cancellation token fires or an
/// input closes, and reports only fatal errors from [`start`](Self::start).
#[async_trait]
pub trait StagingActor {
    /// The error type for the actor.
    type Error: std::fmt::Debug;

    /// Runs the actor to completion.
    async fn start(self) -> Result<(), Self::Error>;
}
