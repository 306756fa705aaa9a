use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type Slot = u64;
pub type Epoch = u64;
pub type Gwei = u64;
pub type ValidatorIndex = u64;
pub type UnixSeconds = u64;

pub const PUBKEY_BYTES: usize = 48;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PubkeyError {
    #[error("pubkey {0:?} is missing the 0x prefix")]
    MissingPrefix(String),
    #[error("pubkey {0:?} must be lowercase hex")]
    NotLowercase(String),
    #[error("pubkey {0:?} decodes to {1} bytes, expected {PUBKEY_BYTES}")]
    WrongLength(String, usize),
    #[error("pubkey {0:?} is not valid hex: {1}")]
    InvalidHex(String, hex::FromHexError),
}

/// A 48-byte BLS public key, always rendered as a lowercase `0x`-prefixed hex string.
///
/// Construction through [`Pubkey::parse`] / [`FromStr`] enforces the validation rule from
/// the watched-set loader (§4.2 step 1): lowercase, `0x`-prefixed, 48 bytes of hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    pub fn parse(raw: &str) -> Result<Self, PubkeyError> {
        let Some(hex_part) = raw.strip_prefix("0x") else {
            return Err(PubkeyError::MissingPrefix(raw.to_owned()));
        };
        if hex_part.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PubkeyError::NotLowercase(raw.to_owned()));
        }
        let bytes =
            hex::decode(hex_part).map_err(|e| PubkeyError::InvalidHex(raw.to_owned(), e))?;
        let array: [u8; PUBKEY_BYTES] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| PubkeyError::WrongLength(raw.to_owned(), v.len()))?;
        Ok(Self(array))
    }

    /// First 10 characters of the hex string, as used in log lines and chat alerts (§8 S2/S3/S6).
    pub fn short(&self) -> String {
        self.to_string().chars().take(10).collect()
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl FromStr for Pubkey {
    type Err = PubkeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl TryFrom<String> for Pubkey {
    type Error = PubkeyError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Pubkey> for String {
    fn from(pubkey: Pubkey) -> Self {
        pubkey.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "0x9100a837dc1b7dc455e9dc81e6fb70da16abb70d7c4f5bfb35f5bc23a67b85f6a88b4b0e04b39e5fc9c1bca4c26944a0";

    #[test]
    fn parses_valid_pubkey() {
        let pubkey = Pubkey::parse(VALID).unwrap();
        assert_eq!(pubkey.to_string(), VALID);
    }

    #[test]
    fn rejects_missing_prefix() {
        let raw = &VALID[2..];
        assert_eq!(Pubkey::parse(raw), Err(PubkeyError::MissingPrefix(raw.to_owned())));
    }

    #[test]
    fn rejects_uppercase() {
        let raw = VALID.to_uppercase();
        assert!(matches!(Pubkey::parse(&raw), Err(PubkeyError::NotLowercase(_))));
    }

    #[test]
    fn rejects_wrong_length() {
        let raw = "0xabcd";
        assert_eq!(
            Pubkey::parse(raw),
            Err(PubkeyError::WrongLength(raw.to_owned(), 2))
        );
    }

    #[test]
    fn short_takes_first_ten_chars() {
        let pubkey = Pubkey::parse(VALID).unwrap();
        assert_eq!(pubkey.short(), VALID[..10]);
    }
}
