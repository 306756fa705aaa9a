use clap::ValueEnum;
use serde_json::{json, Value};

use types::{Epoch, ValidatorIndex};

/// Selects the liveness request shape for the configured beacon node implementation
/// (§9 "Beacon-type polymorphism"). Some nodes expect `{indices, epoch}` in the POST body,
/// others just `{indices}`; some serve an alternative path rather than the standard
/// `/eth/v1/validator/liveness/{epoch}`. Modeled as a strategy selected once from this enum
/// rather than conditional branches scattered across probes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum BeaconType {
    Lighthouse,
    Nimbus,
    OldPrysm,
    OldTeku,
    Other,
}

impl BeaconType {
    pub fn liveness_path(self, epoch: Epoch) -> String {
        match self {
            Self::OldPrysm => "/eth/v1/validator/prysm/liveness".to_owned(),
            Self::OldTeku => format!("/teku/v1/beacon/liveness/{epoch}"),
            Self::Lighthouse | Self::Nimbus | Self::Other => {
                format!("/eth/v1/validator/liveness/{epoch}")
            }
        }
    }

    pub fn liveness_body(self, indices: &[ValidatorIndex], epoch: Epoch) -> Value {
        match self {
            Self::OldPrysm | Self::OldTeku => json!({ "indices": indices, "epoch": epoch }),
            Self::Lighthouse | Self::Nimbus | Self::Other => json!(indices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lighthouse_uses_standard_path_and_bare_indices_body() {
        assert_eq!(
            BeaconType::Lighthouse.liveness_path(5),
            "/eth/v1/validator/liveness/5"
        );
        assert_eq!(BeaconType::Lighthouse.liveness_body(&[1, 2], 5), json!([1, 2]));
    }

    #[test]
    fn old_prysm_uses_alternative_path_and_epoch_in_body() {
        assert_eq!(
            BeaconType::OldPrysm.liveness_path(5),
            "/eth/v1/validator/prysm/liveness"
        );
        assert_eq!(
            BeaconType::OldPrysm.liveness_body(&[1, 2], 5),
            json!({ "indices": [1, 2], "epoch": 5 })
        );
    }
}
