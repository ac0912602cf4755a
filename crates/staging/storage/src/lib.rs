//! Ephemeral staging of locally produced block headers.
//!
//! Headers are written to a [`PendingHeaderContainer`] as soon as they are
//! sealed and stay there until an external authority has ruled on them.
//! The container indexes headers by hash and number through a
//! [`HeaderStore`] over any ordered [`KeyValueStore`], serves "everything
//! since X" range reads and announces every write on a [`HeaderFeed`].

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod config;
pub use config::StagingConfig;

mod container;
pub use container::PendingHeaderContainer;

mod db;
pub use db::{BatchOp, KeyValueStore, MemoryDatabase, WriteBatch};

mod error;
pub use error::{ContainerError, DatabaseError, StorageError};

mod feed;
pub use feed::{HeaderFeed, HeaderSubscription, PendingHeaderEvent, SubscriptionId};

mod metrics;
pub(crate) use metrics::Metrics;

mod schema;

mod store;
pub use store::{HeaderIter, HeaderStore};
