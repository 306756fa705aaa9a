//! Validator classifier (§4.2 steps 2-4): partitions the beacon's full validator listing by
//! lifecycle status and by membership in the watched set.

use std::collections::HashMap;

use types::{Pubkey, ValidatorIndex, ValidatorRecord, WatchedSet};

/// The derived buckets of one validator listing, both net-wide and restricted to the watched
/// set (§3 "Derived sets used throughout").
pub struct ClassifiedValidators {
    pub net_active: HashMap<ValidatorIndex, ValidatorRecord>,
    pub net_pending_queued: HashMap<ValidatorIndex, ValidatorRecord>,
    pub net_withdrawable: HashMap<ValidatorIndex, ValidatorRecord>,
    pub net_exited_slashed: HashMap<ValidatorIndex, ValidatorRecord>,
    pub net_exited_unslashed: HashMap<ValidatorIndex, ValidatorRecord>,
    pub our_active: HashMap<ValidatorIndex, ValidatorRecord>,
    pub our_pending_queued: HashMap<ValidatorIndex, ValidatorRecord>,
    pub our_withdrawable: HashMap<ValidatorIndex, ValidatorRecord>,
    pub our_exited_slashed: HashMap<ValidatorIndex, ValidatorRecord>,
    pub our_exited_unslashed: HashMap<ValidatorIndex, ValidatorRecord>,
}

pub fn classify(validators: Vec<ValidatorRecord>, watched: &WatchedSet) -> ClassifiedValidators {
    let mut net_active = HashMap::new();
    let mut net_pending_queued = HashMap::new();
    let mut net_withdrawable = HashMap::new();
    let mut net_exited_slashed = HashMap::new();
    let mut net_exited_unslashed = HashMap::new();

    for record in validators {
        let bucket = if record.status.is_active() {
            &mut net_active
        } else if record.status.is_pending_queued() {
            &mut net_pending_queued
        } else if record.status.is_withdrawable() {
            &mut net_withdrawable
        } else if record.status.is_slashed_bucket() {
            &mut net_exited_slashed
        } else if record.status.is_exited_unslashed() {
            &mut net_exited_unslashed
        } else {
            continue;
        };
        bucket.insert(record.index, record);
    }

    let restrict = |bucket: &HashMap<ValidatorIndex, ValidatorRecord>| -> HashMap<ValidatorIndex, ValidatorRecord> {
        bucket
            .iter()
            .filter(|(_, record)| watched.contains(&record.pubkey))
            .map(|(idx, record)| (*idx, record.clone()))
            .collect()
    };

    ClassifiedValidators {
        our_active: restrict(&net_active),
        our_pending_queued: restrict(&net_pending_queued),
        our_withdrawable: restrict(&net_withdrawable),
        our_exited_slashed: restrict(&net_exited_slashed),
        our_exited_unslashed: restrict(&net_exited_unslashed),
        net_active,
        net_pending_queued,
        net_withdrawable,
        net_exited_slashed,
        net_exited_unslashed,
    }
}

/// The watched pubkeys present in `bucket`, used by ExitedValidators/SlashedValidators to diff
/// against the previous epoch's observation.
pub fn pubkeys_in(bucket: &HashMap<ValidatorIndex, ValidatorRecord>) -> Vec<Pubkey> {
    bucket.values().map(|record| record.pubkey).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use types::ValidatorStatus;

    fn pk(n: u8) -> Pubkey {
        Pubkey::parse(&format!("0x{:0>96}", format!("{n:x}"))).unwrap()
    }

    #[test]
    fn active_bucket_restricted_to_watched_set() {
        let watched_pk = pk(1);
        let other_pk = pk(2);
        let records = vec![
            ValidatorRecord {
                index: 1,
                pubkey: watched_pk,
                effective_balance: 32_000_000_000,
                slashed: false,
                status: ValidatorStatus::ActiveOngoing,
            },
            ValidatorRecord {
                index: 2,
                pubkey: other_pk,
                effective_balance: 32_000_000_000,
                slashed: false,
                status: ValidatorStatus::ActiveOngoing,
            },
        ];
        let mut pubkeys = BTreeSet::new();
        pubkeys.insert(watched_pk);
        let watched = WatchedSet::new(pubkeys, HashMap::from([(watched_pk, HashMap::new())])).unwrap();

        let classified = classify(records, &watched);
        assert_eq!(classified.net_active.len(), 2);
        assert_eq!(classified.our_active.len(), 1);
        assert!(classified.our_active.contains_key(&1));
    }
}
