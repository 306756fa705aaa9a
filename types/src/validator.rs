use serde::{Deserialize, Serialize};

use crate::primitives::{Gwei, Pubkey, ValidatorIndex};

/// The beacon chain's lifecycle status enumeration (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
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

impl ValidatorStatus {
    /// `active` = `active_ongoing ∪ active_exiting ∪ active_slashed` (§3).
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::ActiveOngoing | Self::ActiveExiting | Self::ActiveSlashed
        )
    }

    /// `withdrawable` = `withdrawal_possible ∪ withdrawal_done` (§3).
    pub fn is_withdrawable(self) -> bool {
        matches!(self, Self::WithdrawalPossible | Self::WithdrawalDone)
    }

    pub fn is_pending_queued(self) -> bool {
        matches!(self, Self::PendingQueued)
    }

    pub fn is_exited_unslashed(self) -> bool {
        matches!(self, Self::ExitedUnslashed)
    }

    /// `exited_slashed ∪ active_slashed`, the set SlashedValidators diffs over (§4.3).
    pub fn is_slashed_bucket(self) -> bool {
        matches!(self, Self::ExitedSlashed | Self::ActiveSlashed)
    }
}

/// `{ pubkey, effective_balance, slashed, status }`, identified by a network-assigned
/// `index` (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub index: ValidatorIndex,
    pub pubkey: Pubkey,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub status: ValidatorStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_bucket_excludes_pending_and_exited() {
        assert!(ValidatorStatus::ActiveOngoing.is_active());
        assert!(ValidatorStatus::ActiveExiting.is_active());
        assert!(ValidatorStatus::ActiveSlashed.is_active());
        assert!(!ValidatorStatus::PendingQueued.is_active());
        assert!(!ValidatorStatus::ExitedUnslashed.is_active());
    }

    #[test]
    fn withdrawable_bucket() {
        assert!(ValidatorStatus::WithdrawalPossible.is_withdrawable());
        assert!(ValidatorStatus::WithdrawalDone.is_withdrawable());
        assert!(!ValidatorStatus::ActiveOngoing.is_withdrawable());
    }
}
