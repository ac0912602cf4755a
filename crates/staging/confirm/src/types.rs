//! Wire types of the confirmation exchange.

use alloy_primitives::B256;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Identifies a staged block for the authority: its hash and the authority
/// slot it was proposed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHash {
    /// Hash of the block header.
    pub hash: B256,
    /// The authority's slot, unrelated to the block number.
    pub slot: u64,
}

impl BlockHash {
    /// Creates a new [`BlockHash`].
    pub const fn new(hash: B256, slot: u64) -> Self {
        Self { hash, slot }
    }
}

/// Verdict of the authority on a single block.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr,
)]
#[repr(u8)]
pub enum Status {
    /// Not decided yet. Ask again in a later batch.
    #[default]
    #[display("pending")]
    Pending = 0,
    /// The block may be treated as canonical.
    #[display("verified")]
    Verified = 1,
    /// The block and its descendants must be discarded.
    #[display("invalid")]
    Invalid = 2,
}

/// Verdict for one requested [`BlockHash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    /// The block the verdict is for.
    #[serde(flatten)]
    pub block_hash: BlockHash,
    /// The verdict.
    pub status: Status,
}

impl BlockStatus {
    /// Creates a new [`BlockStatus`].
    pub const fn new(block_hash: BlockHash, status: Status) -> Self {
        Self { block_hash, status }
    }
}

/// A confirmation response split by verdict, preserving request order in
/// each group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationOutcome {
    /// Blocks that may be promoted.
    pub verified: Vec<BlockHash>,
    /// Blocks that must be rolled back together with their descendants.
    pub invalid: Vec<BlockHash>,
    /// Blocks to ask about again.
    pub pending: Vec<BlockHash>,
}

impl ConfirmationOutcome {
    /// Returns the lowest-slot invalid block, if any.
    pub fn first_invalid(&self) -> Option<&BlockHash> {
        self.invalid.iter().min_by_key(|block| block.slot)
    }

    /// Returns `true` if every block was verified.
    pub fn is_fully_verified(&self) -> bool {
        self.invalid.is_empty() && self.pending.is_empty()
    }
}

impl<'a> FromIterator<&'a BlockStatus> for ConfirmationOutcome {
    fn from_iter<I: IntoIterator<Item = &'a BlockStatus>>(iter: I) -> Self {
        let mut outcome = Self::default();
        for item in iter {
            match item.status {
                Status::Verified => outcome.verified.push(item.block_hash),
                Status::Invalid => outcome.invalid.push(item.block_hash),
                Status::Pending => outcome.pending.push(item.block_hash),
            }
        }
        outcome
    }
}
