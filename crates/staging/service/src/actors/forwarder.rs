//! Forwards staged headers to the confirmation authority.

use crate::{ForwarderConfig, ForwarderError, SlotClock, StagingActor};
use alloy_primitives::B256;
use async_trait::async_trait;
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use vestibule_confirm::{
    BlockConfirmer, BlockHash, BlockStatus, ConfirmError, ConfirmationOutcome, Status,
};
use vestibule_storage::{HeaderSubscription, KeyValueStore, PendingHeaderContainer};

/// Follows a [`PendingHeaderContainer`] and asks the authority about every
/// staged header.
///
/// Headers are queued as `(hash, slot)` pairs and sent in batches of at most
/// `max_batch`, either as soon as a batch is full or on every flush tick.
/// Every returned [`BlockStatus`] is emitted on the verdict channel.
/// Pending blocks go back to the queue. A failed or timed out request puts
/// the whole batch back, its blocks are never reported as invalid.
///
/// Delivery is at least once: a block may be asked about again after a
/// resynchronization.
#[derive(Debug)]
pub struct ForwarderActor<C, DB> {
    container: Arc<PendingHeaderContainer<DB>>,
    confirmer: C,
    config: ForwarderConfig,
    clock: SlotClock,
    verdicts: mpsc::Sender<BlockStatus>,
    cancel_token: CancellationToken,
    queue: VecDeque<BlockHash>,
    /// Last header known to precede any dropped notification.
    checkpoint: B256,
    dropped_seen: u64,
}

impl<C, DB> ForwarderActor<C, DB>
where
    C: BlockConfirmer + 'static,
    DB: KeyValueStore + 'static,
{
    /// Creates a new [`ForwarderActor`].
    pub fn new(
        container: Arc<PendingHeaderContainer<DB>>,
        confirmer: C,
        config: ForwarderConfig,
        verdicts: mpsc::Sender<BlockStatus>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            container,
            confirmer,
            clock: config.slot_clock(),
            config,
            verdicts,
            cancel_token,
            queue: VecDeque::new(),
            checkpoint: B256::ZERO,
            dropped_seen: 0,
        }
    }

    fn max_batch(&self) -> usize {
        self.config.max_batch.max(1)
    }

    fn enqueue(&mut self, hash: B256, timestamp: u64) {
        if self.queue.iter().any(|queued| queued.hash == hash) {
            return;
        }
        let block = BlockHash::new(hash, self.clock.slot_at(timestamp));
        trace!(target: "service::forwarder", %hash, slot = block.slot, "Queued block");
        self.queue.push_back(block);
    }

    /// Queues every header staged since the checkpoint.
    fn resync(&mut self, subscription: &mut HeaderSubscription) -> Result<(), ForwarderError> {
        self.dropped_seen = self.container.feed().dropped();
        let from = self.checkpoint;
        let headers = self.container.read_header_since(from)?;
        debug!(
            target: "service::forwarder",
            %from,
            count = headers.len(),
            "Resynchronizing with container"
        );

        for header in headers {
            let hash = header.hash_slow();
            if hash != from {
                self.enqueue(hash, header.timestamp);
            }
            self.checkpoint = hash;
        }
        // Notifications for headers the range read already queued.
        while let Some(event) = subscription.try_recv() {
            self.enqueue(event.hash, event.header.timestamp);
        }
        Ok(())
    }

    /// Puts `blocks` back at the front of the queue, keeping their order.
    fn requeue_front(&mut self, blocks: impl DoubleEndedIterator<Item = BlockHash>) {
        for block in blocks.rev() {
            self.queue.push_front(block);
        }
    }

    /// Sends the oldest queued blocks to the authority.
    ///
    /// Returns early on cancellation, with every block whose verdict was not
    /// delivered back in the queue.
    async fn flush(&mut self) -> Result<(), ForwarderError> {
        let take = self.queue.len().min(self.max_batch());
        if take == 0 {
            return Ok(());
        }
        let batch: Vec<BlockHash> = self.queue.drain(..take).collect();

        let request =
            tokio::time::timeout(self.config.request_timeout(), self.confirmer.confirm(&batch));
        let result = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => {
                debug!(target: "service::forwarder", count = batch.len(), "Confirmation abandoned");
                self.requeue_front(batch.into_iter());
                return Ok(());
            }
            result = request => {
                result.unwrap_or(Err(ConfirmError::Timeout(self.config.request_timeout_ms)))
            }
        };

        let statuses = match result {
            Ok(statuses) => statuses,
            Err(err) => {
                warn!(
                    target: "service::forwarder",
                    %err,
                    retryable = err.is_retryable(),
                    count = batch.len(),
                    "Confirmation failed, batch queued again"
                );
                self.requeue_front(batch.into_iter());
                return Ok(());
            }
        };

        let outcome: ConfirmationOutcome = statuses.iter().collect();
        debug!(
            target: "service::forwarder",
            verified = outcome.verified.len(),
            invalid = outcome.invalid.len(),
            pending = outcome.pending.len(),
            "Received verdicts"
        );
        if let Some(block) = outcome.first_invalid() {
            warn!(
                target: "service::forwarder",
                hash = %block.hash,
                slot = block.slot,
                "Authority rejected block"
            );
        }

        for (index, status) in statuses.iter().enumerate() {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    let unsent: Vec<BlockHash> =
                        statuses[index..].iter().map(|status| status.block_hash).collect();
                    debug!(
                        target: "service::forwarder",
                        count = unsent.len(),
                        "Verdicts undelivered"
                    );
                    self.requeue_front(unsent.into_iter());
                    return Ok(());
                }
                sent = self.verdicts.send(*status) => {
                    sent.map_err(|_| ForwarderError::VerdictsClosed)?;
                }
            }
            if status.status == Status::Pending {
                self.queue.push_back(status.block_hash);
            }
        }
        Ok(())
    }

    async fn run(&mut self, subscription: &mut HeaderSubscription) -> Result<(), ForwarderError> {
        self.resync(subscription)?;

        let period = self.config.flush_interval().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!(target: "service::forwarder", "Cancellation requested, stopping");
                    return Ok(());
                }
                event = subscription.recv() => {
                    let Some(event) = event else {
                        info!(target: "service::forwarder", "Header feed closed, stopping");
                        return Ok(());
                    };
                    self.enqueue(event.hash, event.header.timestamp);
                    if self.container.feed().dropped() == self.dropped_seen {
                        self.checkpoint = event.hash;
                    } else {
                        warn!(target: "service::forwarder", "Header notifications were dropped");
                        self.resync(subscription)?;
                    }
                    if self.queue.len() >= self.max_batch() {
                        self.flush().await?;
                    }
                }
                _ = ticker.tick() => {
                    self.flush().await?;
                }
            }
        }
    }
}

#[async_trait]
impl<C, DB> StagingActor for ForwarderActor<C, DB>
where
    C: BlockConfirmer + 'static,
    DB: KeyValueStore + 'static,
{
    type Error = ForwarderError;

    async fn start(mut self) -> Result<(), Self::Error> {
        info!(
            target: "service::forwarder",
            max_batch = self.max_batch(),
            flush_interval_ms = self.config.flush_interval_ms,
            "Starting forwarder"
        );

        let mut subscription = self.container.subscribe();
        let result = self.run(&mut subscription).await;
        self.container.unsubscribe(subscription.id());
        result
    }
}
