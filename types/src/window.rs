use std::collections::BTreeMap;

use crate::consts::EPOCH_WINDOW_CAPACITY;
use crate::primitives::{Epoch, ValidatorIndex};
use crate::validator::ValidatorRecord;

/// Ordered mapping from the most recent [`EPOCH_WINDOW_CAPACITY`] epoch numbers to the
/// `{index → validator}` snapshot observed at that epoch boundary (§3).
///
/// Eviction is LRU-by-epoch-number: inserting into a full window drops the smallest key
/// (§3, §9). Looking up an evicted epoch returns `None`; callers that want the fallback
/// described in §4.3 ("fallback to `our_window[e]` if `e-1` is missing") implement that at
/// the call site, since the fallback key differs per probe.
#[derive(Clone, Debug, Default)]
pub struct EpochWindow {
    snapshots: BTreeMap<Epoch, BTreeMap<ValidatorIndex, ValidatorRecord>>,
}

impl EpochWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the snapshot for `epoch`, evicting the smallest key if the window is already
    /// at capacity and `epoch` is not already present (I3).
    pub fn insert(&mut self, epoch: Epoch, snapshot: BTreeMap<ValidatorIndex, ValidatorRecord>) {
        if self.snapshots.len() >= EPOCH_WINDOW_CAPACITY && !self.snapshots.contains_key(&epoch) {
            if let Some(&oldest) = self.snapshots.keys().next() {
                self.snapshots.remove(&oldest);
            }
        }
        self.snapshots.insert(epoch, snapshot);
    }

    pub fn get(&self, epoch: Epoch) -> Option<&BTreeMap<ValidatorIndex, ValidatorRecord>> {
        self.snapshots.get(&epoch)
    }

    pub fn contains_epoch(&self, epoch: Epoch) -> bool {
        self.snapshots.contains_key(&epoch)
    }

    pub fn newest_epoch(&self) -> Option<Epoch> {
        self.snapshots.keys().next_back().copied()
    }

    /// The newest present snapshot, used as the B2 fallback when a specific epoch was evicted.
    pub fn newest(&self) -> Option<&BTreeMap<ValidatorIndex, ValidatorRecord>> {
        self.snapshots.values().next_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn epochs(&self) -> impl Iterator<Item = Epoch> + '_ {
        self.snapshots.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Pubkey;

    fn record(index: ValidatorIndex) -> ValidatorRecord {
        ValidatorRecord {
            index,
            pubkey: Pubkey::parse(
                "0x9100a837dc1b7dc455e9dc81e6fb70da16abb70d7c4f5bfb35f5bc23a67b85f6a88b4b0e04b39e5fc9c1bca4c26944a0",
            )
            .unwrap(),
            effective_balance: 32_000_000_000,
            slashed: false,
            status: crate::validator::ValidatorStatus::ActiveOngoing,
        }
    }

    #[test]
    fn evicts_smallest_key_when_full() {
        let mut window = EpochWindow::new();
        for epoch in 0..EPOCH_WINDOW_CAPACITY as Epoch {
            window.insert(epoch, BTreeMap::from([(epoch, record(epoch))]));
        }
        assert_eq!(window.len(), EPOCH_WINDOW_CAPACITY);

        window.insert(
            EPOCH_WINDOW_CAPACITY as Epoch,
            BTreeMap::from([(99, record(99))]),
        );

        assert_eq!(window.len(), EPOCH_WINDOW_CAPACITY);
        assert!(!window.contains_epoch(0));
        assert!(window.contains_epoch(EPOCH_WINDOW_CAPACITY as Epoch));
    }

    #[test]
    fn newest_falls_back_for_evicted_epoch() {
        let mut window = EpochWindow::new();
        for epoch in 0..=3 {
            window.insert(epoch, BTreeMap::from([(epoch, record(epoch))]));
        }
        assert!(window.get(0).is_none());
        assert_eq!(window.newest_epoch(), Some(3));
    }

    #[test]
    fn reinserting_present_epoch_does_not_evict() {
        let mut window = EpochWindow::new();
        for epoch in 0..EPOCH_WINDOW_CAPACITY as Epoch {
            window.insert(epoch, BTreeMap::new());
        }
        window.insert(1, BTreeMap::from([(7, record(7))]));
        assert_eq!(window.len(), EPOCH_WINDOW_CAPACITY);
        assert!(window.contains_epoch(0));
    }
}
