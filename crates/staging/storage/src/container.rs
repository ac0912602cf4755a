//! The pending header container.

use crate::{
    ContainerError, HeaderFeed, HeaderStore, HeaderSubscription, KeyValueStore, MemoryDatabase,
    Metrics, PendingHeaderEvent, StagingConfig, StorageError, SubscriptionId,
};
use alloy_consensus::Header;
use alloy_primitives::{B256, Sealable};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, trace};

/// Holds locally produced headers until an external authority confirms them.
///
/// The container is a cache: it grows on every write, is never persisted and
/// is trimmed in bulk through [`prune`](Self::prune) or
/// [`reset`](Self::reset) once headers are settled.
///
/// Every write is serialized through an internal writer lock, so each write
/// and its announcement are atomic with respect to other writers. Callers
/// that need to detect competing producers use
/// [`write_header_if_head`](Self::write_header_if_head).
#[derive(Debug)]
pub struct PendingHeaderContainer<DB = MemoryDatabase> {
    store: HeaderStore<DB>,
    feed: HeaderFeed,
    writer: Mutex<()>,
}

impl PendingHeaderContainer<MemoryDatabase> {
    /// Creates an empty in-memory container with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StagingConfig::default())
    }

    /// Creates an empty in-memory container.
    pub fn with_config(config: StagingConfig) -> Self {
        Self::with_database(MemoryDatabase::new(), config)
    }
}

impl Default for PendingHeaderContainer<MemoryDatabase> {
    fn default() -> Self {
        Self::new()
    }
}

impl<DB: KeyValueStore> PendingHeaderContainer<DB> {
    /// Creates a container over an existing backend.
    pub fn with_database(db: DB, config: StagingConfig) -> Self {
        Metrics::init();
        Self {
            store: HeaderStore::new(db),
            feed: HeaderFeed::new(config.feed_capacity),
            writer: Mutex::new(()),
        }
    }

    /// Returns the underlying [`HeaderStore`].
    pub const fn store(&self) -> &HeaderStore<DB> {
        &self.store
    }

    /// Returns the notification feed.
    pub const fn feed(&self) -> &HeaderFeed {
        &self.feed
    }

    /// Subscribes to header arrivals.
    pub fn subscribe(&self) -> HeaderSubscription {
        self.feed.subscribe()
    }

    /// Removes a feed subscriber.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.feed.unsubscribe(id)
    }

    /// Stages a single header, makes it the head and announces it.
    pub fn write_header(&self, header: Header) -> Result<B256, ContainerError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_locked(header)
    }

    /// Stages `headers` one by one, in order.
    ///
    /// The batch is not atomic: if a write fails, the headers before it stay
    /// staged and the error is returned.
    pub fn write_header_batch(
        &self,
        headers: impl IntoIterator<Item = Header>,
    ) -> Result<Vec<B256>, ContainerError> {
        let headers = headers.into_iter();
        let mut hashes = Vec::with_capacity(headers.size_hint().0);
        for header in headers {
            hashes.push(self.write_header(header)?);
        }
        debug!(target: "staging::container", count = hashes.len(), "Wrote header batch");
        Ok(hashes)
    }

    /// Stages `header` only if the current head equals `expected`.
    ///
    /// On mismatch nothing is written and no event is published.
    pub fn write_header_if_head(
        &self,
        expected: Option<B256>,
        header: Header,
    ) -> Result<B256, ContainerError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let actual = self.store.head()?;
        if actual != expected {
            debug!(target: "staging::container", ?expected, ?actual, "Rejected conditional write");
            return Err(ContainerError::HeadMismatch { expected, actual });
        }
        self.write_locked(header)
    }

    fn write_locked(&self, header: Header) -> Result<B256, ContainerError> {
        let sealed = header.seal_slow();
        let hash = sealed.hash();
        let fresh = self.store.number_of(hash)?.is_none();
        self.store.put_sealed(&sealed)?;

        metrics::counter!(Metrics::STAGING_HEADERS_WRITTEN_TOTAL).increment(1);
        if fresh {
            metrics::gauge!(Metrics::STAGING_HEADERS).increment(1.0);
        }

        let (header, hash) = sealed.into_parts();
        let number = header.number;
        let delivered = self.feed.publish(&PendingHeaderEvent { hash, header });
        trace!(target: "staging::container", %hash, number, delivered, "Staged header");
        Ok(hash)
    }

    /// Returns the staged headers from `from` up to the head, ordered by
    /// number and then by hash.
    ///
    /// When `from` is the zero hash or is not staged (never seen, or already
    /// pruned), every staged header is returned so the caller can fully catch
    /// up. An empty container yields an empty list. Numbers in the range with
    /// nothing staged are skipped.
    pub fn read_header_since(&self, from: B256) -> Result<Vec<Header>, ContainerError> {
        let from_number = if from.is_zero() { None } else { self.store.number_of(from)? };
        debug!(target: "staging::container", %from, ?from_number, "Reading headers since");

        let Some(from_number) = from_number else {
            metrics::counter!(Metrics::STAGING_CATCH_UP_TOTAL).increment(1);
            return Ok(self.read_all_headers()?);
        };

        let Some(last_number) = self.head_number()? else {
            return Ok(Vec::new());
        };

        let mut headers = Vec::new();
        for number in from_number..=last_number {
            headers.extend(self.store.headers_by_number(number)?);
        }
        debug!(
            target: "staging::container",
            from_number,
            last_number,
            count = headers.len(),
            "Read headers"
        );
        Ok(headers)
    }

    fn read_all_headers(&self) -> Result<Vec<Header>, StorageError> {
        let headers = self
            .store
            .iter()?
            .map(|entry| entry.map(|(_, header)| header))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(target: "staging::container", count = headers.len(), "Read all staged headers");
        Ok(headers)
    }

    fn head_number(&self) -> Result<Option<u64>, StorageError> {
        match self.store.head()? {
            Some(head) => self.store.number_of(head),
            None => Ok(None),
        }
    }

    /// Returns the hash of the most recently staged header.
    pub fn head(&self) -> Result<Option<B256>, ContainerError> {
        Ok(self.store.head()?)
    }

    /// Returns the most recently staged header.
    pub fn head_header(&self) -> Result<Option<Header>, ContainerError> {
        match self.store.head()? {
            Some(head) => Ok(self.store.header(head)?),
            None => Ok(None),
        }
    }

    /// Returns the number of a staged header.
    pub fn number_of(&self, hash: B256) -> Result<Option<u64>, ContainerError> {
        Ok(self.store.number_of(hash)?)
    }

    /// Returns the staged header with the lowest hash at `number`.
    pub fn header_by_number(&self, number: u64) -> Result<Option<Header>, ContainerError> {
        Ok(self.store.header_by_number(number)?)
    }

    /// Returns the number of staged headers.
    pub fn len(&self) -> Result<usize, ContainerError> {
        Ok(self.store.len()?)
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> Result<bool, ContainerError> {
        Ok(self.store.is_empty()?)
    }

    /// Drops every staged header numbered below `before_number`.
    ///
    /// Returns the number of dropped headers.
    pub fn prune(&self, before_number: u64) -> Result<usize, ContainerError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = self.store.remove_below(before_number)?;
        self.record_removed(removed);
        info!(target: "staging::container", before_number, removed, "Pruned staged headers");
        Ok(removed)
    }

    /// Drops every staged header and the head pointer.
    pub fn reset(&self) -> Result<usize, ContainerError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = self.store.clear()?;
        self.record_removed(removed);
        metrics::gauge!(Metrics::STAGING_HEADERS).set(0.0);
        info!(target: "staging::container", removed, "Reset pending header container");
        Ok(removed)
    }

    fn record_removed(&self, removed: usize) {
        metrics::counter!(Metrics::STAGING_HEADERS_PRUNED_TOTAL).increment(removed as u64);
        metrics::gauge!(Metrics::STAGING_HEADERS).decrement(removed as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DatabaseError, WriteBatch};
    use rstest::rstest;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn header(number: u64) -> Header {
        Header { number, timestamp: number * 12, ..Default::default() }
    }

    fn chain(range: std::ops::RangeInclusive<u64>) -> Vec<Header> {
        range.map(header).collect()
    }

    fn numbers(headers: &[Header]) -> Vec<u64> {
        headers.iter().map(|h| h.number).collect()
    }

    /// Backend that starts failing writes after a fixed number of them.
    #[derive(Debug)]
    struct FailingDatabase {
        inner: MemoryDatabase,
        writes_left: AtomicUsize,
    }

    impl FailingDatabase {
        fn new(writes: usize) -> Self {
            Self { inner: MemoryDatabase::new(), writes_left: AtomicUsize::new(writes) }
        }
    }

    impl KeyValueStore for FailingDatabase {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
            self.inner.get(key)
        }

        fn write(&self, batch: WriteBatch) -> Result<(), DatabaseError> {
            let left = self.writes_left.load(Ordering::SeqCst);
            if left == 0 {
                return Err(DatabaseError::Backend("disk on fire".to_string()));
            }
            self.writes_left.store(left - 1, Ordering::SeqCst);
            self.inner.write(batch)
        }

        fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DatabaseError> {
            self.inner.iter_prefix(prefix)
        }
    }

    #[test]
    fn test_batch_advances_head_and_indexes_all() {
        let container = PendingHeaderContainer::new();
        let headers = chain(1..=5);
        let hashes = container.write_header_batch(headers.clone()).expect("write batch");

        assert_eq!(container.head().unwrap(), Some(headers[4].hash_slow()));
        for (i, hash) in hashes.iter().enumerate() {
            assert_eq!(container.number_of(*hash).unwrap(), Some(headers[i].number));
        }
        assert_eq!(container.head_header().unwrap(), Some(headers[4].clone()));
        assert_eq!(container.len().unwrap(), 5);
    }

    #[rstest]
    #[case::zero_hash(B256::ZERO)]
    #[case::unknown_hash(B256::repeat_byte(0x42))]
    fn test_unresolvable_from_returns_everything(#[case] from: B256) {
        let container = PendingHeaderContainer::new();
        container.write_header_batch(chain(10..=14)).unwrap();

        let headers = container.read_header_since(from).unwrap();
        assert_eq!(numbers(&headers), vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_range_from_known_hash() {
        let container = PendingHeaderContainer::new();
        let headers = chain(1..=6);
        container.write_header_batch(headers.clone()).unwrap();

        let read = container.read_header_since(headers[2].hash_slow()).unwrap();
        assert_eq!(numbers(&read), vec![3, 4, 5, 6]);

        let read = container.read_header_since(headers[5].hash_slow()).unwrap();
        assert_eq!(read, vec![headers[5].clone()]);
    }

    #[test]
    fn test_range_skips_missing_numbers() {
        let container = PendingHeaderContainer::new();
        let sparse = vec![header(1), header(2), header(5), header(7)];
        container.write_header_batch(sparse.clone()).unwrap();

        let read = container.read_header_since(sparse[1].hash_slow()).unwrap();
        assert_eq!(numbers(&read), vec![2, 5, 7]);
    }

    #[rstest]
    #[case::zero_hash(B256::ZERO)]
    #[case::unknown_hash(B256::repeat_byte(0x01))]
    fn test_empty_container_reads_nothing(#[case] from: B256) {
        let container = PendingHeaderContainer::new();
        assert!(container.read_header_since(from).unwrap().is_empty());
        assert!(container.is_empty().unwrap());
    }

    #[test]
    fn test_forked_number_returns_all_siblings_by_hash() {
        let container = PendingHeaderContainer::new();
        let base = header(1);
        let left = Header { extra_data: vec![1].into(), ..header(2) };
        let right = Header { extra_data: vec![2].into(), ..header(2) };
        container.write_header_batch([base.clone(), left.clone(), right.clone()]).unwrap();

        let mut siblings = vec![left, right];
        siblings.sort_by_key(|h| h.hash_slow());

        let read = container.read_header_since(base.hash_slow()).unwrap();
        assert_eq!(read, vec![base, siblings[0].clone(), siblings[1].clone()]);
        assert_eq!(container.header_by_number(2).unwrap(), Some(siblings[0].clone()));
    }

    #[test]
    fn test_from_above_head_is_empty_range() {
        let container = PendingHeaderContainer::new();
        let headers = chain(1..=3);
        container.write_header_batch(headers.clone()).unwrap();
        // Head moves back to a lower number.
        container.write_header(headers[0].clone()).unwrap();

        assert!(container.read_header_since(headers[2].hash_slow()).unwrap().is_empty());
    }

    #[test]
    fn test_conditional_write_detects_competing_producer() {
        let container = PendingHeaderContainer::new();
        let first = container.write_header_if_head(None, header(1)).expect("empty head matches");

        let mut sub = container.subscribe();
        let err = container.write_header_if_head(None, header(2)).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::HeadMismatch { expected: None, actual: Some(actual) } if actual == first
        ));
        assert!(sub.try_recv().is_none());
        assert_eq!(container.len().unwrap(), 1);

        container.write_header_if_head(Some(first), header(2)).expect("head matches");
        assert_eq!(sub.try_recv().map(|e| e.header.number), Some(2));
    }

    #[test]
    fn test_batch_fault_keeps_committed_prefix() {
        let container =
            PendingHeaderContainer::with_database(FailingDatabase::new(2), Default::default());
        let headers = chain(1..=4);

        let err = container.write_header_batch(headers.clone()).unwrap_err();
        assert!(matches!(err, ContainerError::Storage(StorageError::Database(_))));

        assert_eq!(container.len().unwrap(), 2);
        assert_eq!(container.head().unwrap(), Some(headers[1].hash_slow()));
        assert_eq!(numbers(&container.read_header_since(B256::ZERO).unwrap()), vec![1, 2]);
    }

    #[test]
    fn test_prune_and_reset() {
        let container = PendingHeaderContainer::new();
        let headers = chain(1..=5);
        container.write_header_batch(headers.clone()).unwrap();

        assert_eq!(container.prune(3).unwrap(), 2);
        // The pruned hash is unknown now and triggers a full catch-up.
        let read = container.read_header_since(headers[0].hash_slow()).unwrap();
        assert_eq!(numbers(&read), vec![3, 4, 5]);

        assert_eq!(container.reset().unwrap(), 3);
        assert!(container.is_empty().unwrap());
        assert_eq!(container.head().unwrap(), None);
        assert!(container.read_header_since(B256::ZERO).unwrap().is_empty());
    }

    #[test]
    fn test_write_notifies_every_subscriber() {
        let container = PendingHeaderContainer::new();
        let mut subs: Vec<_> = (0..4).map(|_| container.subscribe()).collect();

        let hash = container.write_header(header(9)).unwrap();
        for sub in &mut subs {
            let event = sub.try_recv().expect("event delivered");
            assert_eq!(event.hash, hash);
            assert_eq!(event.header.number, 9);
            assert!(sub.try_recv().is_none());
        }

        assert!(container.unsubscribe(subs[0].id()));
        container.write_header(header(10)).unwrap();
        assert!(subs[0].try_recv().is_none());
        assert!(subs[1].try_recv().is_some());
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_others() {
        let container = Arc::new(PendingHeaderContainer::with_config(StagingConfig {
            feed_capacity: 2,
        }));
        let _stalled = container.subscribe();
        let mut active = container.subscribe();

        let writer = Arc::clone(&container);
        let reader = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(event) = active.recv().await {
                seen.push(event.header.number);
                if seen.len() == 8 {
                    break;
                }
            }
            seen
        });

        for number in 1..=8 {
            writer.write_header(header(number)).unwrap();
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        let seen = reader.await.unwrap();
        assert_eq!(seen, (1..=8).collect::<Vec<_>>());
        assert_eq!(container.feed().dropped(), 6);
    }

    #[test]
    fn test_concurrent_producers_each_commit_and_announce() {
        let container = PendingHeaderContainer::new();
        let mut subscription = container.subscribe();

        std::thread::scope(|scope| {
            for producer in 0..4u64 {
                let container = &container;
                scope.spawn(move || {
                    for offset in 0..25 {
                        container.write_header(header(producer * 100 + offset)).unwrap();
                    }
                });
            }
        });

        assert_eq!(container.len().unwrap(), 100);
        let head = container.head().unwrap().expect("head after writes");
        assert!(container.number_of(head).unwrap().is_some());

        let mut announced = Vec::new();
        while let Some(event) = subscription.try_recv() {
            announced.push(event.hash);
        }
        assert_eq!(announced.len(), 100);
        // The last announcement belongs to the last committed write.
        assert_eq!(announced.last(), Some(&head));
    }
}
