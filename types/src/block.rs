use serde::{Deserialize, Serialize};

use crate::primitives::{Gwei, Pubkey, Slot, ValidatorIndex};

/// An ETH1-style execution address, lowercase hex, `0x`-prefixed, 20 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionAddress([u8; 20]);

impl ExecutionAddress {
    pub fn parse(raw: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(raw.trim_start_matches("0x"))?;
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(array))
    }
}

impl std::fmt::Display for ExecutionAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for ExecutionAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHash(pub [u8; 32]);

impl std::fmt::Display for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// A single attestation included in a block body; only the fields the probe suite needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncludedAttestation {
    pub target_slot: Slot,
    /// Validator indices of committee members that participated, per the aggregation bits.
    pub attesting_indices: Vec<ValidatorIndex>,
    /// Every committee member assigned to this attestation, attesting or not.
    pub committee_indices: Vec<ValidatorIndex>,
}

/// Execution payload carried by a post-Merge block; `None` fields model the pre-Merge /
/// empty-payload case named in §4.3 FeeRecipient.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionPayload {
    pub fee_recipient: Option<ExecutionAddress>,
    pub block_hash: Option<BlockHash>,
}

/// `{ slot, proposer_index, attestations[], execution_payload }`; `None` on miss/skip (§3).
#[derive(Clone, Debug)]
pub struct Block {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub attestations: Vec<IncludedAttestation>,
    pub execution_payload: ExecutionPayload,
}

/// `{ pubkey, validator_index, slot }` (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProposerDuty {
    pub pubkey: Pubkey,
    pub validator_index: ValidatorIndex,
    pub slot: Slot,
}

/// `{ slot, value_wei, proposer_pubkey }`, absent if the relay did not serve the block (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayPayload {
    pub slot: Slot,
    pub value_wei: u128,
    pub proposer_pubkey: Pubkey,
}

impl RelayPayload {
    /// `value / 1e9` gwei, as credited to the per-validator MEV-boost-reward counter (§4.4).
    pub fn value_gwei(&self) -> Gwei {
        (self.value_wei / 1_000_000_000) as Gwei
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_gwei_divides_by_1e9() {
        let payload = RelayPayload {
            slot: 1,
            value_wei: 32_000_000_000_000_000_000,
            proposer_pubkey: crate::primitives::Pubkey::parse(
                "0x9100a837dc1b7dc455e9dc81e6fb70da16abb70d7c4f5bfb35f5bc23a67b85f6a88b4b0e04b39e5fc9c1bca4c26944a0",
            )
            .unwrap(),
        };
        assert_eq!(payload.value_gwei(), 32_000_000_000);
    }
}
