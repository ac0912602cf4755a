//! Actors wiring the header stage to its confirmation authority.
//!
//! The [`ForwarderActor`] follows a [`PendingHeaderContainer`] and batches
//! every staged header into confirmation requests. The [`RpcActor`] serves
//! the container to downstream readers. Both run until their
//! [`CancellationToken`] fires.
//!
//! [`PendingHeaderContainer`]: vestibule_storage::PendingHeaderContainer
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod actors;
pub use actors::{ForwarderActor, RpcActor, StagingActor};

mod config;
pub use config::{ConfigError, ForwarderConfig, RpcConfig, VestibuleConfig};

mod error;
pub use error::ForwarderError;

mod slot;
pub use slot::SlotClock;
