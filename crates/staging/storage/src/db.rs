//! The ordered, byte-addressable key-value layer underneath the header store.
//!
//! [`KeyValueStore`] is the only contract the staging layer needs from its
//! backend. [`MemoryDatabase`] is the ephemeral implementation used by the
//! [`PendingHeaderContainer`](crate::PendingHeaderContainer).

use crate::DatabaseError;
use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite `key` with `value`.
    Put {
        /// The key to write.
        key: Vec<u8>,
        /// The value to store.
        value: Vec<u8>,
    },
    /// Remove `key` if present.
    Delete {
        /// The key to remove.
        key: Vec<u8>,
    },
}

/// An ordered list of mutations committed atomically by [`KeyValueStore::write`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Queues a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Put { key: key.into(), value: value.into() });
        self
    }

    /// Queues a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key: key.into() });
        self
    }

    /// Returns the number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if nothing has been queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consumes the batch, yielding its operations in insertion order.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// An ordered byte-addressable key-value store.
///
/// Implementations must apply a [`WriteBatch`] atomically: readers observe
/// either none or all of its operations. Iteration is in ascending
/// lexicographic key order.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored at `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError>;

    /// Returns `true` if `key` is present.
    fn has(&self, key: &[u8]) -> Result<bool, DatabaseError> {
        Ok(self.get(key)?.is_some())
    }

    /// Atomically applies every operation in `batch`.
    fn write(&self, batch: WriteBatch) -> Result<(), DatabaseError>;

    /// Returns a snapshot of every entry whose key starts with `prefix`, in
    /// ascending key order.
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DatabaseError>;
}

/// In-memory [`KeyValueStore`] backed by a [`BTreeMap`].
///
/// Once [`close`](Self::close)d, every operation fails with
/// [`DatabaseError::Closed`].
#[derive(Debug)]
pub struct MemoryDatabase {
    entries: RwLock<Option<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    /// Creates an empty, open database.
    pub fn new() -> Self {
        Self { entries: RwLock::new(Some(BTreeMap::new())) }
    }

    /// Closes the database and drops its contents.
    pub fn close(&self) {
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the number of stored keys, or `0` once closed.
    pub fn len(&self) -> usize {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map_or(0, BTreeMap::len)
    }

    /// Returns `true` if the database holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryDatabase {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entries = guard.as_ref().ok_or(DatabaseError::Closed)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> Result<(), DatabaseError> {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entries = guard.as_mut().ok_or(DatabaseError::Closed)?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DatabaseError> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entries = guard.as_ref().ok_or(DatabaseError::Closed)?;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
