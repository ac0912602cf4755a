//! Reference validating authority.

use crate::{BlockHash, BlockStatus, OrchestratorApiServer, Status};
use alloy_primitives::{B256, map::HashMap};
use async_trait::async_trait;
use jsonrpsee::{
    core::RpcResult,
    server::{ServerBuilder, ServerHandle},
    types::{ErrorObject, error::ErrorCode},
};
use std::{
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::{info, trace, warn};

/// Authority applying the reference policy: a hash recorded as invalid or
/// pending gets that verdict, every other hash is verified.
///
/// Useful as a local stand-in for the real authority and in tests.
#[derive(Debug, Clone, Default)]
pub struct ReferenceAuthority {
    verdicts: Arc<RwLock<HashMap<B256, Status>>>,
}

impl ReferenceAuthority {
    /// Creates an authority that verifies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `hashes` as invalid.
    pub fn with_invalid(self, hashes: impl IntoIterator<Item = B256>) -> Self {
        hashes.into_iter().for_each(|hash| self.set_status(hash, Status::Invalid));
        self
    }

    /// Records `hashes` as pending.
    pub fn with_pending(self, hashes: impl IntoIterator<Item = B256>) -> Self {
        hashes.into_iter().for_each(|hash| self.set_status(hash, Status::Pending));
        self
    }

    /// Overrides the verdict for `hash`.
    pub fn set_status(&self, hash: B256, status: Status) {
        self.verdicts.write().unwrap_or_else(PoisonError::into_inner).insert(hash, status);
    }

    /// Answers a confirmation request.
    pub fn verdicts(&self, request: &[BlockHash]) -> Vec<BlockStatus> {
        let verdicts = self.verdicts.read().unwrap_or_else(PoisonError::into_inner);
        request
            .iter()
            .map(|block| {
                let status = verdicts.get(&block.hash).copied().unwrap_or(Status::Verified);
                BlockStatus::new(*block, status)
            })
            .collect()
    }

    /// Serves the authority on `socket`. Returns the bound address and the
    /// server handle.
    pub async fn launch(self, socket: SocketAddr) -> std::io::Result<(SocketAddr, ServerHandle)> {
        let server = ServerBuilder::default().build(socket).await?;
        let addr = server.local_addr()?;
        info!(target: "confirm::authority", %addr, "Reference authority listening");
        Ok((addr, server.start(self.into_rpc())))
    }
}

#[async_trait]
impl OrchestratorApiServer for ReferenceAuthority {
    async fn confirm_pan_block_hashes(
        &self,
        request: Vec<BlockHash>,
    ) -> RpcResult<Vec<BlockStatus>> {
        if request.is_empty() {
            warn!(target: "confirm::authority", "Rejected empty confirmation request");
            return Err(ErrorObject::owned(
                ErrorCode::InvalidParams.code(),
                "empty request",
                None::<()>,
            ));
        }
        trace!(
            target: "confirm::authority",
            count = request.len(),
            "Received confirmation request"
        );
        Ok(self.verdicts(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reference_policy() {
        let invalid = B256::repeat_byte(0xaa);
        let pending = B256::repeat_byte(0xbb);
        let other = B256::repeat_byte(0xcc);
        let authority =
            ReferenceAuthority::new().with_invalid([invalid]).with_pending([pending]);

        let request =
            vec![BlockHash::new(invalid, 1), BlockHash::new(pending, 2), BlockHash::new(other, 3)];
        let response = authority.confirm_pan_block_hashes(request.clone()).await.unwrap();
        let statuses: Vec<_> = response.iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![Status::Invalid, Status::Pending, Status::Verified]);
        assert_eq!(response.iter().map(|s| s.block_hash).collect::<Vec<_>>(), request);
    }

    #[tokio::test]
    async fn test_empty_request_is_invalid_params() {
        let err = ReferenceAuthority::new().confirm_pan_block_hashes(Vec::new()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParams.code());
        assert_eq!(err.message(), "empty request");
    }

    #[tokio::test]
    async fn test_status_can_change() {
        let hash = B256::repeat_byte(0x01);
        let authority = ReferenceAuthority::new().with_pending([hash]);
        assert_eq!(authority.verdicts(&[BlockHash::new(hash, 1)])[0].status, Status::Pending);

        authority.set_status(hash, Status::Verified);
        assert_eq!(authority.verdicts(&[BlockHash::new(hash, 1)])[0].status, Status::Verified);
    }
}
