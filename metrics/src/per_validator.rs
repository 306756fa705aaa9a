use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};

const PUBKEY_LABEL: &str = "pubkey";
const CATEGORY_LABEL: &str = "category";
const MEV_RELAY_LABEL: &str = "mev_relay";

/// Per-label-schema counters/gauges, constructed the first time the watched-set loader returns
/// a non-empty labels map (§4.5). The schema (the labels file's key set, plus the mandatory
/// `pubkey` label) is frozen for the process lifetime (I4); only the value sets grow.
pub struct PerValidatorMetrics {
    schema: Vec<String>,
    pub missed_attestations: IntCounterVec,
    pub double_missed_attestations: IntCounterVec,
    pub missed_block_head: IntCounterVec,
    pub missed_block_finalized: IntCounterVec,
    pub block_reward: IntCounterVec,
    pub sync_committee_membership: IntCounterVec,
    pub sync_committee_reward: IntCounterVec,
    /// Labeled additionally by `category` ∈ {source, target, head, sum}.
    pub ideal_reward: IntCounterVec,
    pub actual_reward_positive: IntCounterVec,
    pub actual_reward_negative: IntCounterVec,
    pub suboptimal_attestations: IntCounterVec,
    /// Labeled additionally by `mev_relay`, the one extension to the base schema (§4.5).
    pub mev_boost_reward: IntCounterVec,
    pub fee_recipient_mismatch: IntCounterVec,
    /// Cleared and repopulated at every epoch boundary rather than monotone (§4.5 special case).
    pub active_validators: IntGaugeVec,
}

impl PerValidatorMetrics {
    /// Builds and registers every per-validator family against `label_keys`, the labels file's
    /// key schema. Panics only on a prometheus-internal invariant violation (duplicate name),
    /// which would be a programmer error, not a runtime condition.
    pub fn register(registry: &Registry, label_keys: &[String]) -> Self {
        let mut base: Vec<&str> = label_keys.iter().map(String::as_str).collect();
        base.push(PUBKEY_LABEL);

        let mut with_category = base.clone();
        with_category.push(CATEGORY_LABEL);

        let mut with_relay = base.clone();
        with_relay.push(MEV_RELAY_LABEL);

        macro_rules! counter_vec {
            ($name:expr, $help:expr, $labels:expr) => {{
                let v = IntCounterVec::new(Opts::new($name, $help), $labels).expect("valid metric spec");
                registry.register(Box::new(v.clone())).expect("no name collision");
                v
            }};
        }
        macro_rules! gauge_vec {
            ($name:expr, $help:expr, $labels:expr) => {{
                let v = IntGaugeVec::new(Opts::new($name, $help), $labels).expect("valid metric spec");
                registry.register(Box::new(v.clone())).expect("no name collision");
                v
            }};
        }

        Self {
            schema: label_keys.to_vec(),
            missed_attestations: counter_vec!(
                "missed_attestations_per_validator",
                "Missed attestations per watched validator",
                &base
            ),
            double_missed_attestations: counter_vec!(
                "double_missed_attestations_per_validator",
                "Consecutive missed attestations per watched validator",
                &base
            ),
            missed_block_head: counter_vec!(
                "missed_block_head_per_validator",
                "Missed block proposals observed at the chain head",
                &base
            ),
            missed_block_finalized: counter_vec!(
                "missed_block_finalized_per_validator",
                "Missed block proposals confirmed finalized",
                &base
            ),
            block_reward: counter_vec!(
                "block_reward_gwei_per_validator",
                "Consensus-layer block reward credited to the proposer",
                &base
            ),
            sync_committee_membership: counter_vec!(
                "sync_committee_membership_per_validator",
                "Sync committee periods a watched validator has been a member of",
                &base
            ),
            sync_committee_reward: counter_vec!(
                "sync_committee_reward_gwei_per_validator",
                "Sync committee reward credited per slot",
                &base
            ),
            ideal_reward: counter_vec!(
                "ideal_attestation_reward_gwei_per_validator",
                "Ideal attestation reward per validator and reward category",
                &with_category
            ),
            actual_reward_positive: counter_vec!(
                "actual_attestation_reward_positive_gwei_per_validator",
                "Positive actual attestation reward per validator and category",
                &with_category
            ),
            actual_reward_negative: counter_vec!(
                "actual_attestation_reward_negative_gwei_per_validator",
                "Negative actual attestation reward (penalty) per validator and category",
                &with_category
            ),
            suboptimal_attestations: counter_vec!(
                "suboptimal_attestations_per_validator",
                "Attestations included with suboptimal timing/inclusion per validator",
                &base
            ),
            mev_boost_reward: counter_vec!(
                "mev_boost_reward_gwei_per_validator",
                "MEV-Boost reward credited per validator and relay",
                &with_relay
            ),
            fee_recipient_mismatch: counter_vec!(
                "fee_recipient_mismatch_per_validator",
                "Blocks proposed with a fee recipient outside the configured allow-list",
                &base
            ),
            active_validators: gauge_vec!(
                "our_active_validators_per_validator",
                "1 per active watched validator, grouped by label dimensions",
                &base
            ),
        }
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }
}
