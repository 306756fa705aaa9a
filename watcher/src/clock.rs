//! Slot/epoch clock (§4.1): an infinite lazy sequence of `(slot, slot_start)` advancing from the
//! genesis timestamp, sleeping at most one slot between emissions and re-aligning to wall clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::info;
use types::consts::SLOT_SECONDS;
use types::{Slot, UnixSeconds};

/// `now - genesis_time`, expressed as a signed slot index: negative while waiting for genesis.
fn slot_at(genesis_time: UnixSeconds, now: UnixSeconds) -> i64 {
    (now as i64 - genesis_time as i64).div_euclid(SLOT_SECONDS as i64)
}

pub struct SlotClock {
    genesis_time: UnixSeconds,
    next_slot: i64,
}

impl SlotClock {
    pub fn new(genesis_time: UnixSeconds, now: UnixSeconds) -> Self {
        Self {
            genesis_time,
            next_slot: slot_at(genesis_time, now),
        }
    }

    pub fn slot_start(&self, slot: i64) -> i64 {
        self.genesis_time as i64 + slot * SLOT_SECONDS as i64
    }

    /// Sleeps until `next_slot`'s start, then returns `(slot, slot_start)` and advances. Never
    /// skips or reorders slots; if the host clock runs backward the next tick simply sleeps
    /// longer, since `slot_start` is computed from the fixed genesis anchor rather than the
    /// previous tick's observed time.
    pub async fn tick(&mut self) -> (i64, i64) {
        let slot = self.next_slot;
        let slot_start = self.slot_start(slot);
        let now = unix_now();
        if slot_start > now {
            let wait = (slot_start - now).min(SLOT_SECONDS as i64).max(0);
            tokio::time::sleep(Duration::from_secs(wait as u64)).await;
        }
        if slot < 0 {
            info!(slot, "⏳ waiting for genesis");
        }
        self.next_slot += 1;
        (slot, slot_start)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Converts a non-negative clock slot into the domain [`Slot`] type.
pub fn as_slot(raw: i64) -> Option<Slot> {
    (raw >= 0).then_some(raw as Slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_at_genesis_is_zero() {
        assert_eq!(slot_at(1000, 1000), 0);
    }

    #[test]
    fn slot_before_genesis_is_negative() {
        assert_eq!(slot_at(1000, 988), -1);
    }

    #[test]
    fn slot_advances_every_twelve_seconds() {
        assert_eq!(slot_at(0, 12), 1);
        assert_eq!(slot_at(0, 23), 1);
        assert_eq!(slot_at(0, 24), 2);
    }

    #[test]
    fn as_slot_rejects_negative() {
        assert_eq!(as_slot(-1), None);
        assert_eq!(as_slot(5), Some(5));
    }
}
