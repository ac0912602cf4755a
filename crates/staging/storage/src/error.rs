use alloy_primitives::B256;
use thiserror::Error;

/// Faults raised by a [`KeyValueStore`](crate::KeyValueStore) backend.
///
/// These are treated as fatal by the staging layer: nothing in this crate
/// retries a failed backend operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    /// The database has been closed and can no longer serve requests.
    #[error("database closed")]
    Closed,

    /// The backend failed to complete an operation.
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Errors that may occur while interacting with the header store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// DatabaseError
    #[error("Database error")]
    Database(#[from] DatabaseError),

    /// A stored header could not be decoded.
    #[error("failed to decode header {hash}: {source}")]
    HeaderDecode {
        /// Hash of the header that failed to decode.
        hash: B256,
        /// The underlying RLP error.
        #[source]
        source: alloy_rlp::Error,
    },

    /// A stored number index entry has an unexpected width.
    #[error("corrupt number index for {0}")]
    CorruptNumber(B256),

    /// A stored head pointer has an unexpected width.
    #[error("corrupt head pointer")]
    CorruptHead,
}

/// Errors returned by the [`PendingHeaderContainer`](crate::PendingHeaderContainer).
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Indicates that error occurred while interacting with the storage layer.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A conditional write observed a head other than the one it expected.
    #[error("head mismatch: expected {expected:?}, found {actual:?}")]
    HeadMismatch {
        /// The head the writer expected.
        expected: Option<B256>,
        /// The head that was actually staged.
        actual: Option<B256>,
    },
}
