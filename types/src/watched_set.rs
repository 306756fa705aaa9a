use std::collections::{BTreeSet, HashMap};

use crate::primitives::Pubkey;

/// An unordered set of watched pubkeys together with their label dimensions (§3).
///
/// Every pubkey present must have a `labels` entry, and all `labels` entries must share the
/// same key schema (enforced by [`WatchedSet::new`]). The set is fully replaced at each epoch
/// boundary rather than mutated in place.
#[derive(Clone, Debug, Default)]
pub struct WatchedSet {
    pubkeys: BTreeSet<Pubkey>,
    labels: HashMap<Pubkey, HashMap<String, String>>,
    /// The label key schema shared by every entry in `labels`, `None` until the first
    /// non-empty labels file load (§4.5).
    schema: Option<BTreeSet<String>>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WatchedSetError {
    #[error("pubkey {0} is missing a labels entry")]
    MissingLabels(Pubkey),
    #[error("label schema mismatch: expected keys {expected:?}, got {got:?} for {pubkey}")]
    SchemaMismatch {
        pubkey: Pubkey,
        expected: BTreeSet<String>,
        got: BTreeSet<String>,
    },
}

impl WatchedSet {
    pub fn new(
        pubkeys: BTreeSet<Pubkey>,
        labels: HashMap<Pubkey, HashMap<String, String>>,
    ) -> Result<Self, WatchedSetError> {
        let mut schema: Option<BTreeSet<String>> = None;
        for pubkey in &pubkeys {
            let entry = labels
                .get(pubkey)
                .ok_or(WatchedSetError::MissingLabels(*pubkey))?;
            let keys: BTreeSet<String> = entry.keys().cloned().collect();
            match &schema {
                None => schema = Some(keys),
                Some(expected) if expected != &keys => {
                    return Err(WatchedSetError::SchemaMismatch {
                        pubkey: *pubkey,
                        expected: expected.clone(),
                        got: keys,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(Self {
            pubkeys,
            labels,
            schema,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pubkeys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pubkeys.len()
    }

    pub fn contains(&self, pubkey: &Pubkey) -> bool {
        self.pubkeys.contains(pubkey)
    }

    pub fn pubkeys(&self) -> impl Iterator<Item = &Pubkey> {
        self.pubkeys.iter()
    }

    pub fn labels_for(&self, pubkey: &Pubkey) -> Option<&HashMap<String, String>> {
        self.labels.get(pubkey)
    }

    /// The frozen label key schema, `None` when the set (or its labels) is empty (§4.5, B3).
    pub fn schema(&self) -> Option<&BTreeSet<String>> {
        self.schema.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(n: u8) -> Pubkey {
        Pubkey::parse(&format!("0x{:0>96}", format!("{n:x}"))).unwrap()
    }

    #[test]
    fn empty_set_has_no_schema() {
        let set = WatchedSet::new(BTreeSet::new(), HashMap::new()).unwrap();
        assert!(set.is_empty());
        assert!(set.schema().is_none());
    }

    #[test]
    fn missing_labels_entry_fails() {
        let mut pubkeys = BTreeSet::new();
        pubkeys.insert(pk(1));
        let err = WatchedSet::new(pubkeys, HashMap::new()).unwrap_err();
        assert!(matches!(err, WatchedSetError::MissingLabels(_)));
    }

    #[test]
    fn inconsistent_schema_fails() {
        let mut pubkeys = BTreeSet::new();
        pubkeys.insert(pk(1));
        pubkeys.insert(pk(2));
        let mut labels = HashMap::new();
        labels.insert(pk(1), HashMap::from([("team".to_owned(), "a".to_owned())]));
        labels.insert(pk(2), HashMap::from([("other".to_owned(), "b".to_owned())]));
        let err = WatchedSet::new(pubkeys, labels).unwrap_err();
        assert!(matches!(err, WatchedSetError::SchemaMismatch { .. }));
    }

    #[test]
    fn consistent_schema_succeeds() {
        let mut pubkeys = BTreeSet::new();
        pubkeys.insert(pk(1));
        pubkeys.insert(pk(2));
        let mut labels = HashMap::new();
        labels.insert(pk(1), HashMap::from([("team".to_owned(), "a".to_owned())]));
        labels.insert(pk(2), HashMap::from([("team".to_owned(), "b".to_owned())]));
        let set = WatchedSet::new(pubkeys, labels).unwrap();
        assert_eq!(set.schema().unwrap().len(), 1);
    }
}
