//! Fan-out feed announcing newly staged headers.

use crate::Metrics;
use alloy_consensus::Header;
use alloy_primitives::B256;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{trace, warn};

/// Announcement that a header has been written to the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHeaderEvent {
    /// Hash of the written header.
    pub hash: B256,
    /// The written header.
    pub header: Header,
}

/// Identifies a subscriber of a [`HeaderFeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// A live subscription to a [`HeaderFeed`].
///
/// Dropping the subscription unsubscribes it on the next publish.
#[derive(Debug)]
pub struct HeaderSubscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<PendingHeaderEvent>,
}

impl HeaderSubscription {
    /// Returns the id to pass to [`HeaderFeed::unsubscribe`].
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event. Returns `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<PendingHeaderEvent> {
        self.receiver.recv().await
    }

    /// Returns the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<PendingHeaderEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Multi-subscriber event feed with a bounded queue per subscriber.
///
/// Publishing never blocks. When a subscriber's queue is full the event is
/// dropped for that subscriber only and counted in [`HeaderFeed::dropped`];
/// other subscribers are unaffected. Subscribers whose receiver has been
/// dropped are removed.
#[derive(Debug)]
pub struct HeaderFeed {
    capacity: usize,
    next_id: AtomicU64,
    dropped: AtomicU64,
    subscribers: Mutex<BTreeMap<SubscriptionId, mpsc::Sender<PendingHeaderEvent>>>,
}

impl HeaderFeed {
    /// Default per-subscriber queue depth.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a feed whose subscribers each buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            subscribers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> HeaderSubscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).insert(id, sender);
        trace!(target: "staging::feed", ?id, "Subscriber registered");
        HeaderSubscription { id, receiver }
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed =
            self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).remove(&id).is_some();
        trace!(target: "staging::feed", ?id, removed, "Subscriber removed");
        removed
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns how many deliveries have been dropped because a subscriber's
    /// queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Delivers `event` to every subscriber without waiting. Returns the
    /// number of subscribers that accepted it.
    pub fn publish(&self, event: &PendingHeaderEvent) -> usize {
        let senders: Vec<_> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sender) in senders {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!(Metrics::STAGING_NOTIFICATIONS_DROPPED_TOTAL).increment(1);
                    warn!(
                        target: "staging::feed",
                        ?id,
                        hash = %event.hash,
                        "Subscriber queue full, dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            for id in closed {
                subscribers.remove(&id);
                trace!(target: "staging::feed", ?id, "Pruned closed subscriber");
            }
        }
        delivered
    }
}

impl Default for HeaderFeed {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
