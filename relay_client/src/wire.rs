use serde::Deserialize;

use types::Pubkey;

#[derive(Debug, Deserialize)]
pub struct BidTrace {
    #[serde(with = "string_u64")]
    pub slot: u64,
    #[serde(with = "string_u128")]
    pub value: u128,
    pub proposer_pubkey: Pubkey,
}

#[derive(Debug, Deserialize)]
pub struct RegisteredValidatorEntry {
    #[serde(with = "string_u64")]
    pub slot: u64,
    pub entry: RegisteredValidatorMessage,
}

#[derive(Debug, Deserialize)]
pub struct RegisteredValidatorMessage {
    pub message: RegisteredValidatorPubkey,
}

#[derive(Debug, Deserialize)]
pub struct RegisteredValidatorPubkey {
    pub pubkey: Pubkey,
}

mod string_u64 {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        String::deserialize(d)?.parse().map_err(serde::de::Error::custom)
    }
}

mod string_u128 {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        String::deserialize(d)?.parse().map_err(serde::de::Error::custom)
    }
}
