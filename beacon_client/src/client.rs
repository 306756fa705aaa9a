//! The beacon node HTTP contract (§6): genesis, validator listing, proposer duties,
//! block-by-slot, finalized header, liveness, attestation rewards, sync-committee reward and
//! roster. One client per configured beacon node, sharing the [`http_retry`] transport.

use std::collections::HashMap;

use tracing::warn;

use error_utils::HttpError;
use types::{
    Block, Epoch, ExecutionAddress, ExecutionPayload, Gwei, IncludedAttestation, ProposerDuty,
    Pubkey, Slot, UnixSeconds, ValidatorIndex, ValidatorRecord,
};

use crate::beacon_type::BeaconType;
use crate::wire::{
    self, AttestationRewardRow, BeaconBlockBody, CommitteeEntry, DataEnvelope, GenesisData,
    IdealRewardRow, LivenessMap, ProposerDutiesData, SignedBeaconBlock, SyncCommitteeData,
    ValidatorEntry,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RewardTriple {
    pub head: i64,
    pub target: i64,
    pub source: i64,
}

impl From<AttestationRewardRow> for RewardTriple {
    fn from(row: AttestationRewardRow) -> Self {
        Self {
            head: row.head,
            target: row.target,
            source: row.source,
        }
    }
}

impl From<IdealRewardRow> for RewardTriple {
    fn from(row: IdealRewardRow) -> Self {
        Self {
            head: row.head,
            target: row.target,
            source: row.source,
        }
    }
}

/// Thin wrapper over a beacon node base URL, carrying the node's [`BeaconType`] so the
/// liveness probe can pick the right request shape without the caller knowing about it.
pub struct BeaconClient {
    http: reqwest::Client,
    base_url: String,
    beacon_type: BeaconType,
}

impl BeaconClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, beacon_type: BeaconType) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            beacon_type,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn genesis_time(&self) -> Result<UnixSeconds, HttpError> {
        let envelope: DataEnvelope<GenesisData> =
            http_retry::get_json(&self.http, &self.url("/eth/v1/beacon/genesis"), &self.base_url)
                .await?;
        Ok(envelope.data.genesis_time)
    }

    /// The complete validator set as of the chain head (§4.2 "network validator universe").
    pub async fn validators(&self) -> Result<Vec<ValidatorRecord>, HttpError> {
        let envelope: DataEnvelope<Vec<ValidatorEntry>> = http_retry::get_json(
            &self.http,
            &self.url("/eth/v1/beacon/states/head/validators"),
            &self.base_url,
        )
        .await?;
        Ok(envelope
            .data
            .into_iter()
            .filter_map(|entry| {
                let index = entry.index.parse().ok()?;
                Some(ValidatorRecord {
                    index,
                    pubkey: entry.validator.pubkey,
                    effective_balance: entry.validator.effective_balance,
                    slashed: entry.validator.slashed,
                    status: entry.status.into(),
                })
            })
            .collect())
    }

    pub async fn proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerDuty>, HttpError> {
        let data: ProposerDutiesData = http_retry::get_json(
            &self.http,
            &self.url(&format!("/eth/v1/validator/duties/proposer/{epoch}")),
            &self.base_url,
        )
        .await?;
        Ok(data
            .data
            .into_iter()
            .map(|entry| ProposerDuty {
                pubkey: entry.pubkey,
                validator_index: entry.validator_index,
                slot: entry.slot,
            })
            .collect())
    }

    /// `None` on a missed/skipped slot (404), per §3's `Option<Block>` domain model.
    pub async fn block(&self, slot: Slot) -> Result<Option<Block>, HttpError> {
        let url = self.url(&format!("/eth/v2/beacon/blocks/{slot}"));
        match http_retry::get_json::<SignedBeaconBlock>(&self.http, &url, &self.base_url).await {
            Ok(signed) => {
                let block = self
                    .to_domain_block(signed.data.message.slot, signed.data.message.proposer_index, signed.data.message.body)
                    .await;
                Ok(Some(block))
            }
            Err(HttpError::RetryExhausted { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// The validator indices assigned to one committee at `slot`, in aggregation-bit order
    /// (§4.3 SuboptimalAttestations).
    pub async fn committee(&self, slot: Slot, committee_index: u64) -> Result<Vec<ValidatorIndex>, HttpError> {
        let url = self.url(&format!(
            "/eth/v1/beacon/states/head/committees?slot={slot}&index={committee_index}"
        ));
        let envelope: DataEnvelope<Vec<CommitteeEntry>> =
            http_retry::get_json(&self.http, &url, &self.base_url).await?;
        Ok(envelope.data.into_iter().next().map(|entry| entry.validators).unwrap_or_default())
    }

    /// Resolves each attestation's committee roster and zips it against the aggregation bitfield
    /// so `attesting_indices`/`committee_indices` are populated for the SuboptimalAttestations
    /// probe. Committees are fetched once per distinct `(slot, index)` pair in the block, since
    /// many attestations in the same block share a committee.
    async fn to_domain_block(&self, slot: Slot, proposer_index: ValidatorIndex, body: BeaconBlockBody) -> Block {
        let mut committees: HashMap<(Slot, u64), Vec<ValidatorIndex>> = HashMap::new();
        let mut attestations = Vec::with_capacity(body.attestations.len());

        for entry in body.attestations {
            let key = (entry.data.slot, entry.data.index);
            if !committees.contains_key(&key) {
                match self.committee(entry.data.slot, entry.data.index).await {
                    Ok(members) => {
                        committees.insert(key, members);
                    }
                    Err(source) => {
                        warn!(%source, slot = entry.data.slot, index = entry.data.index, "could not fetch committee roster");
                        committees.insert(key, Vec::new());
                    }
                }
            }
            let committee_indices = committees.get(&key).cloned().unwrap_or_default();
            let attesting_indices = aggregation_bits_to_indices(&entry.aggregation_bits, &committee_indices);
            attestations.push(IncludedAttestation {
                target_slot: entry.data.slot,
                attesting_indices,
                committee_indices,
            });
        }

        let execution_payload = body
            .execution_payload
            .map(|payload| ExecutionPayload {
                fee_recipient: payload
                    .fee_recipient
                    .as_deref()
                    .and_then(|raw| ExecutionAddress::parse(raw).ok()),
                block_hash: payload.block_hash.as_deref().and_then(parse_block_hash),
            })
            .unwrap_or_default();

        Block {
            slot,
            proposer_index,
            attestations,
            execution_payload,
        }
    }

    pub async fn finalized_slot(&self) -> Result<Slot, HttpError> {
        let header: DataEnvelope<wire::FinalizedHeaderData> = http_retry::get_json(
            &self.http,
            &self.url("/eth/v1/beacon/headers/finalized"),
            &self.base_url,
        )
        .await?;
        Ok(header.data.header.message.slot)
    }

    /// Liveness for `indices` in `epoch`, via the strategy selected by this node's [`BeaconType`].
    pub async fn liveness(
        &self,
        epoch: Epoch,
        indices: &[ValidatorIndex],
    ) -> Result<LivenessMap, HttpError> {
        let url = self.url(&self.beacon_type.liveness_path(epoch));
        let body = self.beacon_type.liveness_body(indices, epoch);
        let envelope: DataEnvelope<Vec<wire::LivenessEntry>> =
            http_retry::post_json(&self.http, &url, &self.base_url, &body).await?;
        Ok(envelope
            .data
            .into_iter()
            .map(|entry| (entry.index, entry.is_live))
            .collect())
    }

    /// `validator_index -> actual` attestation rewards for `epoch` (§4.3 Rewards). Callers pair
    /// each row with [`Self::ideal_rewards_by_balance`] keyed by that validator's own effective
    /// balance, since the ideal baseline is shared across validators at the same balance.
    pub async fn attestation_rewards(
        &self,
        epoch: Epoch,
        indices: &[ValidatorIndex],
    ) -> Result<HashMap<ValidatorIndex, RewardTriple>, HttpError> {
        let url = self.url(&format!("/eth/v1/beacon/rewards/attestations/{epoch}"));
        let envelope: DataEnvelope<wire::AttestationRewardsData> =
            http_retry::post_json(&self.http, &url, &self.base_url, &indices).await?;
        Ok(envelope
            .data
            .total_rewards
            .into_iter()
            .map(|row| (row.validator_index, row.into()))
            .collect())
    }

    /// The ideal-reward row keyed by effective balance, used by the caller to look up the
    /// baseline matching each validator's own effective balance (§4.3 Rewards).
    pub async fn ideal_rewards_by_balance(
        &self,
        epoch: Epoch,
    ) -> Result<HashMap<Gwei, RewardTriple>, HttpError> {
        let url = self.url(&format!("/eth/v1/beacon/rewards/attestations/{epoch}"));
        let empty: Vec<ValidatorIndex> = Vec::new();
        let envelope: DataEnvelope<wire::AttestationRewardsData> =
            http_retry::post_json(&self.http, &url, &self.base_url, &empty).await?;
        Ok(envelope
            .data
            .ideal_rewards
            .into_iter()
            .map(|row| (row.effective_balance, row.into()))
            .collect())
    }

    pub async fn sync_committee_reward(
        &self,
        slot: Slot,
        indices: &[ValidatorIndex],
    ) -> Result<HashMap<ValidatorIndex, i64>, HttpError> {
        let url = self.url(&format!("/eth/v1/beacon/rewards/sync_committee/{slot}"));
        let envelope: DataEnvelope<Vec<wire::SyncCommitteeRewardRow>> =
            http_retry::post_json(&self.http, &url, &self.base_url, &indices).await?;
        Ok(envelope
            .data
            .into_iter()
            .map(|row| (row.validator_index, row.reward))
            .collect())
    }

    /// Total proposer reward for `slot` (§4.3 BlockReward).
    pub async fn block_reward(&self, slot: Slot) -> Result<Gwei, HttpError> {
        let url = self.url(&format!("/eth/v1/beacon/rewards/blocks/{slot}"));
        let envelope: DataEnvelope<wire::BlockRewardData> =
            http_retry::get_json(&self.http, &url, &self.base_url).await?;
        Ok(envelope.data.total)
    }

    /// The current sync committee roster, rotated every [`types::consts::SYNC_COMMITTEE_PERIOD_EPOCHS`]
    /// epochs; caching that rotation boundary is the caller's job (§9).
    pub async fn sync_committee(&self, epoch: Epoch) -> Result<Vec<Pubkey>, HttpError> {
        let url = self.url(&format!("/eth/v1/beacon/states/head/sync_committees?epoch={epoch}"));
        let envelope: DataEnvelope<SyncCommitteeData> =
            http_retry::get_json(&self.http, &url, &self.base_url).await?;
        Ok(envelope
            .data
            .validators
            .into_iter()
            .filter_map(|raw| Pubkey::parse(&raw).ok())
            .collect())
    }
}

fn parse_block_hash(raw: &str) -> Option<types::block::BlockHash> {
    let bytes = hex::decode(raw.trim_start_matches("0x")).ok()?;
    let array: [u8; 32] = bytes.try_into().ok()?;
    Some(types::block::BlockHash(array))
}

/// Zips a hex-encoded SSZ bitlist against the committee roster it was taken over: bit `i`
/// (LSB-first within each byte) corresponds to `committee[i]`.
fn aggregation_bits_to_indices(aggregation_bits: &str, committee: &[ValidatorIndex]) -> Vec<ValidatorIndex> {
    let Ok(bytes) = hex::decode(aggregation_bits.trim_start_matches("0x")) else {
        return Vec::new();
    };
    committee
        .iter()
        .enumerate()
        .filter_map(|(i, validator_index)| {
            let byte = *bytes.get(i / 8)?;
            let bit_set = (byte >> (i % 8)) & 1 == 1;
            bit_set.then_some(*validator_index)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_bits_selects_committee_members_by_bit_position() {
        let committee = vec![10, 11, 12, 13, 14];
        // 0b00010101 -> bits 0, 2, 4 set -> committee[0], committee[2], committee[4].
        let attesting = aggregation_bits_to_indices("0x15", &committee);
        assert_eq!(attesting, vec![10, 12, 14]);
    }

    #[test]
    fn aggregation_bits_invalid_hex_yields_empty() {
        assert!(aggregation_bits_to_indices("not-hex", &[1, 2, 3]).is_empty());
    }
}
