//! Client side of the confirmation exchange.

use crate::{BlockHash, BlockStatus, ConfirmError, Metrics, OrchestratorApiClient};
use async_trait::async_trait;
use core::fmt::Debug;
use jsonrpsee::core::client::ClientT;
use tracing::{debug, warn};

/// Submits staged blocks to a validating authority.
///
/// Implementations hold no state between calls and may be invoked
/// concurrently. A successful call returns exactly one [`BlockStatus`] per
/// requested block, positionally matched.
#[async_trait]
pub trait BlockConfirmer: Debug + Send + Sync {
    /// Asks the authority for a verdict on every block in `request`.
    async fn confirm(&self, request: &[BlockHash]) -> Result<Vec<BlockStatus>, ConfirmError>;
}

/// A [`BlockConfirmer`] talking JSON-RPC to a remote authority through any
/// `jsonrpsee` client.
#[derive(Debug, Clone)]
pub struct AuthorityClient<C> {
    /// The inner RPC client.
    client: C,
}

impl<C> AuthorityClient<C> {
    /// Creates a new [`AuthorityClient`] over `client` and describes the
    /// confirmation metrics.
    pub fn new(client: C) -> Self {
        Metrics::init();
        Self { client }
    }

    /// Returns the inner RPC client.
    pub const fn inner(&self) -> &C {
        &self.client
    }
}

impl<C> AuthorityClient<C>
where
    C: ClientT + Send + Sync,
{
    /// Calls `orc_confirmPanBlockHashes`.
    ///
    /// An empty `request` fails with [`ConfirmError::EmptyRequest`] without
    /// any network call.
    pub async fn confirm_pan_block_hashes(
        &self,
        request: &[BlockHash],
    ) -> Result<Vec<BlockStatus>, ConfirmError> {
        if request.is_empty() {
            return Err(ConfirmError::EmptyRequest);
        }

        metrics::counter!(Metrics::CONFIRM_REQUESTS_TOTAL).increment(1);
        let response = self
            .client
            .confirm_pan_block_hashes(request.to_vec())
            .await
            .map_err(ConfirmError::from)
            .inspect_err(|err| {
                metrics::counter!(Metrics::CONFIRM_REQUEST_ERRORS_TOTAL).increment(1);
                warn!(
                    target: "confirm::client",
                    %err,
                    count = request.len(),
                    "Confirmation request failed"
                );
            })?;

        check_response(request, &response)?;
        for item in &response {
            metrics::counter!(Metrics::CONFIRM_STATUS_TOTAL, "status" => item.status.to_string())
                .increment(1);
        }
        debug!(target: "confirm::client", count = response.len(), "Received block confirmations");
        Ok(response)
    }
}

#[async_trait]
impl<C> BlockConfirmer for AuthorityClient<C>
where
    C: ClientT + Debug + Send + Sync,
{
    async fn confirm(&self, request: &[BlockHash]) -> Result<Vec<BlockStatus>, ConfirmError> {
        self.confirm_pan_block_hashes(request).await
    }
}

/// Checks that `response` holds one status per requested block, in order.
pub(crate) fn check_response(
    request: &[BlockHash],
    response: &[BlockStatus],
) -> Result<(), ConfirmError> {
    if request.len() != response.len() {
        return Err(ConfirmError::MalformedResponse(format!(
            "expected {} statuses, got {}",
            request.len(),
            response.len()
        )));
    }
    if let Some((index, (asked, got))) = request
        .iter()
        .zip(response)
        .enumerate()
        .find(|(_, (asked, got))| **asked != got.block_hash)
    {
        return Err(ConfirmError::MalformedResponse(format!(
            "item {index} answers {:?}, requested {:?}",
            got.block_hash, asked
        )));
    }
    Ok(())
}
