//! The confirmation exchange between the header stage and a validating
//! authority.
//!
//! Staged blocks are identified to the authority by [`BlockHash`] (hash and
//! authority slot) and answered with one [`BlockStatus`] each. The exchange
//! runs over JSON-RPC, see [`OrchestratorApiClient`] and
//! [`OrchestratorApiServer`].

mod authority;
pub use authority::ReferenceAuthority;

mod client;
pub use client::{AuthorityClient, BlockConfirmer};

mod error;
pub use error::ConfirmError;

mod jsonrpsee;
pub use jsonrpsee::{OrchestratorApiClient, OrchestratorApiServer};

mod metrics;
pub(crate) use metrics::Metrics;

mod types;
pub use types::{BlockHash, BlockStatus, ConfirmationOutcome, Status};
