//! JSON shapes of the beacon HTTP contract consumed (§6), kept separate from the domain types
//! in the `types` crate so a future wire-format change stays contained here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use types::{Gwei, Pubkey, Slot, ValidatorIndex, ValidatorStatus};

#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct GenesisData {
    #[serde(with = "unix_seconds_as_string")]
    pub genesis_time: u64,
}

#[derive(Debug, Deserialize)]
pub struct ValidatorEntry {
    pub index: String,
    pub status: RawValidatorStatus,
    pub validator: ValidatorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ValidatorDetail {
    pub pubkey: Pubkey,
    #[serde(with = "gwei_as_string")]
    pub effective_balance: Gwei,
    pub slashed: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawValidatorStatus {
    PendingInitialized,
    PendingQueued,
    ActiveOngoing,
    ActiveExiting,
    ActiveSlashed,
    ExitedUnslashed,
    ExitedSlashed,
    WithdrawalPossible,
    WithdrawalDone,
}

impl From<RawValidatorStatus> for ValidatorStatus {
    fn from(raw: RawValidatorStatus) -> Self {
        match raw {
            RawValidatorStatus::PendingInitialized => Self::PendingInitialized,
            RawValidatorStatus::PendingQueued => Self::PendingQueued,
            RawValidatorStatus::ActiveOngoing => Self::ActiveOngoing,
            RawValidatorStatus::ActiveExiting => Self::ActiveExiting,
            RawValidatorStatus::ActiveSlashed => Self::ActiveSlashed,
            RawValidatorStatus::ExitedUnslashed => Self::ExitedUnslashed,
            RawValidatorStatus::ExitedSlashed => Self::ExitedSlashed,
            RawValidatorStatus::WithdrawalPossible => Self::WithdrawalPossible,
            RawValidatorStatus::WithdrawalDone => Self::WithdrawalDone,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProposerDutyEntry {
    pub pubkey: Pubkey,
    #[serde(with = "index_as_string")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "slot_as_string")]
    pub slot: Slot,
}

#[derive(Debug, Deserialize)]
pub struct ProposerDutiesData {
    pub data: Vec<ProposerDutyEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SignedBeaconBlock {
    pub data: BeaconBlockMessageEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct BeaconBlockMessageEnvelope {
    pub message: BeaconBlockMessage,
}

#[derive(Debug, Deserialize)]
pub struct BeaconBlockMessage {
    #[serde(with = "slot_as_string")]
    pub slot: Slot,
    #[serde(with = "index_as_string")]
    pub proposer_index: ValidatorIndex,
    pub body: BeaconBlockBody,
}

#[derive(Debug, Deserialize)]
pub struct BeaconBlockBody {
    #[serde(default)]
    pub attestations: Vec<AttestationEntry>,
    pub execution_payload: Option<ExecutionPayloadEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AttestationEntry {
    pub aggregation_bits: String,
    pub data: AttestationDataEntry,
}

#[derive(Debug, Deserialize)]
pub struct AttestationDataEntry {
    #[serde(with = "slot_as_string")]
    pub slot: Slot,
    #[serde(with = "index_as_string")]
    pub index: u64,
}

/// `/eth/v1/beacon/states/{state}/committees` (§4.3 SuboptimalAttestations): the validator
/// indices assigned to one committee at one slot, in aggregation-bit order.
#[derive(Debug, Deserialize)]
pub struct CommitteeEntry {
    #[serde(with = "slot_as_string")]
    pub slot: Slot,
    #[serde(with = "index_as_string")]
    pub index: u64,
    #[serde(deserialize_with = "index_list_as_strings")]
    pub validators: Vec<ValidatorIndex>,
}

fn index_list_as_strings<'de, D>(d: D) -> Result<Vec<ValidatorIndex>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(d)?;
    raw.into_iter()
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct ExecutionPayloadEntry {
    pub fee_recipient: Option<String>,
    pub block_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizedHeaderData {
    pub header: FinalizedHeaderMessage,
}

#[derive(Debug, Deserialize)]
pub struct FinalizedHeaderMessage {
    pub message: FinalizedHeaderSlot,
}

#[derive(Debug, Deserialize)]
pub struct FinalizedHeaderSlot {
    #[serde(with = "slot_as_string")]
    pub slot: Slot,
}

#[derive(Debug, Deserialize)]
pub struct LivenessEntry {
    #[serde(with = "index_as_string")]
    pub index: ValidatorIndex,
    pub is_live: bool,
}

/// `{source, target, head}` reward rows for a single validator (§4.3 Rewards).
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct AttestationRewardRow {
    #[serde(with = "index_as_string")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "i64_as_string")]
    pub head: i64,
    #[serde(with = "i64_as_string")]
    pub target: i64,
    #[serde(with = "i64_as_string")]
    pub source: i64,
}

#[derive(Debug, Deserialize)]
pub struct AttestationRewardsData {
    pub ideal_rewards: Vec<IdealRewardRow>,
    pub total_rewards: Vec<AttestationRewardRow>,
}

/// Ideal reward keyed by effective balance (§4.3 Rewards: "the ideal-reward row keyed by that
/// validator's effective balance").
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct IdealRewardRow {
    #[serde(with = "gwei_as_string")]
    pub effective_balance: Gwei,
    #[serde(with = "i64_as_string")]
    pub head: i64,
    #[serde(with = "i64_as_string")]
    pub target: i64,
    #[serde(with = "i64_as_string")]
    pub source: i64,
}

#[derive(Debug, Deserialize)]
pub struct SyncCommitteeRewardRow {
    #[serde(with = "index_as_string")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "i64_as_string")]
    pub reward: i64,
}

#[derive(Debug, Deserialize)]
pub struct SyncCommitteeData {
    pub validators: Vec<String>,
}

/// `/eth/v1/beacon/rewards/blocks/{block_id}` (§4.3 BlockReward): total reward credited to the
/// proposer, combining attestation, sync-committee and slashing rewards for that block.
#[derive(Debug, Deserialize)]
pub struct BlockRewardData {
    #[serde(with = "index_as_string")]
    pub proposer_index: ValidatorIndex,
    #[serde(with = "gwei_as_string")]
    pub total: Gwei,
}

pub type LivenessMap = HashMap<ValidatorIndex, bool>;

mod unix_seconds_as_string {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

mod gwei_as_string {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

mod index_as_string {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

mod slot_as_string {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

mod i64_as_string {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_time_parses_from_json_string() {
        let envelope: DataEnvelope<GenesisData> =
            serde_json::from_str(r#"{"data":{"genesis_time":"1606824023"}}"#).unwrap();
        assert_eq!(envelope.data.genesis_time, 1_606_824_023);
    }

    #[test]
    fn block_reward_total_parses_from_json_string() {
        let envelope: DataEnvelope<BlockRewardData> = serde_json::from_str(
            r#"{"data":{"proposer_index":"42","total":"24000000"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.data.proposer_index, 42);
        assert_eq!(envelope.data.total, 24_000_000);
    }

    #[test]
    fn attestation_rewards_splits_ideal_and_total() {
        let envelope: DataEnvelope<AttestationRewardsData> = serde_json::from_str(
            r#"{"data":{
                "ideal_rewards":[{"effective_balance":"32000000000","head":"10","target":"20","source":"15"}],
                "total_rewards":[{"validator_index":"7","head":"9","target":"18","source":"14"}]
            }}"#,
        )
        .unwrap();
        assert_eq!(envelope.data.ideal_rewards[0].effective_balance, 32_000_000_000);
        assert_eq!(envelope.data.total_rewards[0].validator_index, 7);
    }
}
