//! Contains the staging configuration.

use crate::HeaderFeed;
use serde::{Deserialize, Serialize};

/// Configuration of a [`PendingHeaderContainer`](crate::PendingHeaderContainer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StagingConfig {
    /// Number of notifications buffered per feed subscriber before new
    /// events are dropped for that subscriber.
    pub feed_capacity: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self { feed_capacity: HeaderFeed::DEFAULT_CAPACITY }
    }
}
