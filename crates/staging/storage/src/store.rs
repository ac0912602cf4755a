//! Hash and number indexed header store.

use crate::{
    KeyValueStore, StorageError, WriteBatch,
    schema::{
        HEAD_HEADER_KEY, HEADER_NUMBER_PREFIX, HEADER_PREFIX, decode_header_key, decode_number,
        encode_number, header_key, header_number_key, header_number_prefix,
    },
};
use alloy_consensus::Header;
use alloy_primitives::{B256, Sealable, Sealed};
use alloy_rlp::Decodable;
use tracing::{debug, error, trace};

/// Indexes headers by hash and by number on top of a [`KeyValueStore`], and
/// tracks the most recently written header as the head.
///
/// Several hashes may share one number. Lookups by number resolve them in
/// ascending hash order.
#[derive(Debug)]
pub struct HeaderStore<DB> {
    db: DB,
}

impl<DB> HeaderStore<DB> {
    /// Creates a store over `db`.
    pub const fn new(db: DB) -> Self {
        Self { db }
    }

    /// Returns a reference to the backing database.
    pub const fn db(&self) -> &DB {
        &self.db
    }
}

impl<DB: KeyValueStore> HeaderStore<DB> {
    /// Writes `header`, indexes its number and makes it the head.
    ///
    /// All three entries are committed in a single batch. Returns the header
    /// hash.
    pub fn put(&self, header: &Header) -> Result<B256, StorageError> {
        self.put_sealed(&header.clone().seal_slow())
    }

    /// Same as [`put`](Self::put) for a header whose hash is already known.
    pub fn put_sealed(&self, sealed: &Sealed<Header>) -> Result<B256, StorageError> {
        let (header, hash) = (sealed.inner(), sealed.hash());
        let mut batch = WriteBatch::new();
        batch
            .put(header_key(header.number, hash), alloy_rlp::encode(header))
            .put(header_number_key(hash), encode_number(header.number).to_vec())
            .put(HEAD_HEADER_KEY.to_vec(), hash.to_vec());

        self.db.write(batch).inspect_err(|err| {
            error!(
                target: "staging::store",
                %hash,
                number = header.number,
                %err,
                "Failed to write header"
            );
        })?;
        trace!(target: "staging::store", %hash, number = header.number, "Stored header");
        Ok(hash)
    }

    /// Returns the number indexed for `hash`, or `None` if the hash is unknown.
    pub fn number_of(&self, hash: B256) -> Result<Option<u64>, StorageError> {
        let Some(raw) = self.db.get(&header_number_key(hash))? else {
            return Ok(None);
        };
        decode_number(&raw).map(Some).ok_or(StorageError::CorruptNumber(hash))
    }

    /// Returns the header stored under `hash`.
    pub fn header(&self, hash: B256) -> Result<Option<Header>, StorageError> {
        let Some(number) = self.number_of(hash)? else {
            return Ok(None);
        };
        self.db.get(&header_key(number, hash))?.map(|raw| decode_header(hash, &raw)).transpose()
    }

    /// Returns every hash indexed at `number`, in ascending byte order.
    pub fn hashes_by_number(&self, number: u64) -> Result<Vec<B256>, StorageError> {
        Ok(self
            .db
            .iter_prefix(&header_number_prefix(number))?
            .into_iter()
            .filter_map(|(key, _)| decode_header_key(&key).map(|(_, hash)| hash))
            .collect())
    }

    /// Returns every header stored at `number`, ordered by hash.
    pub fn headers_by_number(&self, number: u64) -> Result<Vec<Header>, StorageError> {
        self.db
            .iter_prefix(&header_number_prefix(number))?
            .into_iter()
            .filter_map(|(key, raw)| decode_header_key(&key).map(|(_, hash)| (hash, raw)))
            .map(|(hash, raw)| decode_header(hash, &raw))
            .collect()
    }

    /// Returns the header with the lowest hash at `number`, if any.
    pub fn header_by_number(&self, number: u64) -> Result<Option<Header>, StorageError> {
        let Some(hash) = self.hashes_by_number(number)?.into_iter().next() else {
            return Ok(None);
        };
        self.db.get(&header_key(number, hash))?.map(|raw| decode_header(hash, &raw)).transpose()
    }

    /// Returns the hash of the most recently written header.
    pub fn head(&self) -> Result<Option<B256>, StorageError> {
        let Some(raw) = self.db.get(HEAD_HEADER_KEY)? else {
            return Ok(None);
        };
        if raw.len() != 32 {
            return Err(StorageError::CorruptHead);
        }
        Ok(Some(B256::from_slice(&raw)))
    }

    /// Returns a fresh iterator over the stored `(hash, header)` pairs,
    /// ordered by number and then by hash.
    ///
    /// The iterator works on a snapshot taken at call time and decodes lazily.
    pub fn iter(&self) -> Result<HeaderIter, StorageError> {
        Ok(HeaderIter { entries: self.db.iter_prefix(HEADER_PREFIX)?.into_iter() })
    }

    /// Returns the number of stored headers.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.db.iter_prefix(HEADER_NUMBER_PREFIX)?.len())
    }

    /// Returns `true` if no header is stored.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.head()?.is_none() && self.len()? == 0)
    }

    /// Removes every header numbered below `number`.
    ///
    /// Clears the head pointer if the head itself was removed. Returns the
    /// number of removed headers.
    pub fn remove_below(&self, number: u64) -> Result<usize, StorageError> {
        let head = self.head()?;
        let mut batch = WriteBatch::new();
        let mut removed = 0;
        let mut head_removed = false;

        for (key, _) in self.db.iter_prefix(HEADER_PREFIX)? {
            let Some((entry_number, hash)) = decode_header_key(&key) else {
                continue;
            };
            if entry_number >= number {
                break;
            }
            batch.delete(key).delete(header_number_key(hash));
            head_removed |= head == Some(hash);
            removed += 1;
        }
        if head_removed {
            batch.delete(HEAD_HEADER_KEY.to_vec());
        }
        if batch.is_empty() {
            return Ok(0);
        }

        self.db.write(batch)?;
        debug!(target: "staging::store", below = number, removed, head_removed, "Removed headers");
        Ok(removed)
    }

    /// Removes every header and the head pointer. Returns the number of
    /// removed headers.
    pub fn clear(&self) -> Result<usize, StorageError> {
        let mut batch = WriteBatch::new();
        let mut removed = 0;
        for (key, _) in self.db.iter_prefix(HEADER_PREFIX)? {
            batch.delete(key);
            removed += 1;
        }
        for (key, _) in self.db.iter_prefix(HEADER_NUMBER_PREFIX)? {
            batch.delete(key);
        }
        batch.delete(HEAD_HEADER_KEY.to_vec());

        self.db.write(batch)?;
        debug!(target: "staging::store", removed, "Cleared header store");
        Ok(removed)
    }
}

/// Iterator over a snapshot of the header store, see [`HeaderStore::iter`].
#[derive(Debug)]
pub struct HeaderIter {
    entries: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl Iterator for HeaderIter {
    type Item = Result<(B256, Header), StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        for (key, raw) in self.entries.by_ref() {
            if let Some((_, hash)) = decode_header_key(&key) {
                return Some(decode_header(hash, &raw).map(|header| (hash, header)));
            }
        }
        None
    }
}

fn decode_header(hash: B256, mut raw: &[u8]) -> Result<Header, StorageError> {
    Header::decode(&mut raw).map_err(|source| StorageError::HeaderDecode { hash, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;

    fn header(number: u64, extra: u8) -> Header {
        Header { number, extra_data: vec![extra].into(), ..Default::default() }
    }

    fn setup_store() -> HeaderStore<MemoryDatabase> {
        HeaderStore::new(MemoryDatabase::new())
    }

    #[test]
    fn test_put_indexes_and_advances_head() {
        let store = setup_store();
        assert_eq!(store.head().unwrap(), None);

        let first = header(1, 0);
        let second = header(2, 0);
        let first_hash = store.put(&first).expect("put first");
        let second_hash = store.put(&second).expect("put second");

        assert_eq!(first_hash, first.hash_slow());
        assert_eq!(store.head().unwrap(), Some(second_hash));
        assert_eq!(store.number_of(first_hash).unwrap(), Some(1));
        assert_eq!(store.number_of(second_hash).unwrap(), Some(2));
        assert_eq!(store.header(first_hash).unwrap(), Some(first));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_unknown_lookups_are_absent() {
        let store = setup_store();
        store.put(&header(7, 0)).unwrap();

        assert_eq!(store.number_of(B256::repeat_byte(0xab)).unwrap(), None);
        assert_eq!(store.header(B256::repeat_byte(0xab)).unwrap(), None);
        assert_eq!(store.header_by_number(8).unwrap(), None);
        assert!(store.hashes_by_number(6).unwrap().is_empty());
    }

    #[test]
    fn test_same_number_resolves_to_lowest_hash() {
        let store = setup_store();
        let a = header(5, 1);
        let b = header(5, 2);
        store.put(&a).unwrap();
        store.put(&b).unwrap();

        let mut expected = vec![a.hash_slow(), b.hash_slow()];
        expected.sort();
        assert_eq!(store.hashes_by_number(5).unwrap(), expected);

        let first = store.header_by_number(5).unwrap().expect("header at 5");
        assert_eq!(first.hash_slow(), expected[0]);
        assert_eq!(store.headers_by_number(5).unwrap().len(), 2);
    }

    #[test]
    fn test_iter_is_restartable_and_ordered() {
        let store = setup_store();
        for number in [3, 1, 2] {
            store.put(&header(number, 0)).unwrap();
        }

        let numbers: Vec<u64> =
            store.iter().unwrap().map(|entry| entry.unwrap().1.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        store.put(&header(4, 0)).unwrap();
        assert_eq!(store.iter().unwrap().count(), 4);
    }

    #[test]
    fn test_remove_below_keeps_head_when_retained() {
        let store = setup_store();
        let hashes: Vec<_> = (1..=4).map(|n| store.put(&header(n, 0)).unwrap()).collect();

        assert_eq!(store.remove_below(3).unwrap(), 2);
        assert_eq!(store.number_of(hashes[0]).unwrap(), None);
        assert_eq!(store.number_of(hashes[2]).unwrap(), Some(3));
        assert_eq!(store.head().unwrap(), Some(hashes[3]));
        assert_eq!(store.remove_below(3).unwrap(), 0);
    }

    #[test]
    fn test_remove_below_head_clears_pointer() {
        let store = setup_store();
        store.put(&header(1, 0)).unwrap();
        store.put(&header(2, 0)).unwrap();

        assert_eq!(store.remove_below(10).unwrap(), 2);
        assert_eq!(store.head().unwrap(), None);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_clear_wipes_everything() {
        let store = setup_store();
        store.put(&header(1, 0)).unwrap();
        store.put(&header(1, 1)).unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.is_empty().unwrap());
        assert!(store.db().is_empty());
    }

    #[test]
    fn test_backend_fault_is_surfaced() {
        let store = setup_store();
        store.db().close();

        assert!(matches!(store.put(&header(1, 0)), Err(StorageError::Database(_))));
        assert!(matches!(store.head(), Err(StorageError::Database(_))));
    }
}
