//! Maps header timestamps to authority slots.

/// Fixed-length slot schedule of the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotClock {
    genesis_time: u64,
    slot_duration: u64,
}

impl SlotClock {
    /// Creates a clock starting at `genesis_time` with slots of
    /// `slot_duration` seconds. A zero duration is treated as one second.
    pub const fn new(genesis_time: u64, slot_duration: u64) -> Self {
        let slot_duration = if slot_duration == 0 { 1 } else { slot_duration };
        Self { genesis_time, slot_duration }
    }

    /// Returns the slot containing `timestamp`. Timestamps before genesis
    /// fall in slot zero.
    pub const fn slot_at(&self, timestamp: u64) -> u64 {
        timestamp.saturating_sub(self.genesis_time) / self.slot_duration
    }

    /// Returns the first timestamp of `slot`.
    pub const fn slot_start(&self, slot: u64) -> u64 {
        self.genesis_time.saturating_add(slot.saturating_mul(self.slot_duration))
    }
}
