//! Watched-set loader (§4.2 step 1): unions pubkeys from an optional file and an optional
//! signing-service query, validates every pubkey, and resolves per-pubkey labels.

use std::collections::{BTreeSet, HashMap};
use std::fs;

use anyhow::{Context, Result};
use types::{Pubkey, WatchedSet};

use crate::config::parse_label_pairs;

pub struct WatchedSetLoader {
    pubkeys_file_path: Option<String>,
    labels_file_path: Option<String>,
    remove_first_label: bool,
    web3signer_url: Option<String>,
    http: reqwest::Client,
}

impl WatchedSetLoader {
    pub fn new(
        pubkeys_file_path: Option<String>,
        labels_file_path: Option<String>,
        remove_first_label: bool,
        web3signer_url: Option<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            pubkeys_file_path,
            labels_file_path,
            remove_first_label,
            web3signer_url,
            http,
        }
    }

    /// Resolves the current [`WatchedSet`]. A malformed pubkey anywhere in either source fails
    /// the whole call (§4.2 step 1: "on any invalid pubkey the loader fails the whole iteration").
    pub async fn load(&self) -> Result<WatchedSet> {
        let mut pubkeys: BTreeSet<Pubkey> = BTreeSet::new();

        if let Some(path) = &self.pubkeys_file_path {
            for line in read_nonempty_lines(path)? {
                pubkeys.insert(
                    Pubkey::parse(&line)
                        .with_context(|| format!("invalid pubkey {line:?} in {path}"))?,
                );
            }
        }

        if let Some(url) = &self.web3signer_url {
            for raw in self.fetch_web3signer_keys(url).await? {
                pubkeys.insert(
                    Pubkey::parse(&raw).with_context(|| format!("invalid pubkey {raw:?} from web3signer"))?,
                );
            }
        }

        let labels = match &self.labels_file_path {
            Some(path) => self.load_labels(path, &pubkeys)?,
            None => pubkeys.iter().map(|pk| (*pk, HashMap::new())).collect(),
        };

        Ok(WatchedSet::new(pubkeys, labels)?)
    }

    async fn fetch_web3signer_keys(&self, url: &str) -> Result<Vec<String>> {
        #[derive(serde::Deserialize)]
        struct KeystoresResponse {
            data: Vec<KeystoreEntry>,
        }
        #[derive(serde::Deserialize)]
        struct KeystoreEntry {
            validating_pubkey: String,
        }

        let full_url = format!("{}/eth/v1/keystores", url.trim_end_matches('/'));
        let response: KeystoresResponse = self
            .http
            .get(&full_url)
            .send()
            .await
            .with_context(|| format!("contacting web3signer at {url}"))?
            .json()
            .await
            .with_context(|| format!("decoding web3signer response from {url}"))?;
        Ok(response.data.into_iter().map(|e| e.validating_pubkey).collect())
    }

    /// First column is the pubkey (dropped from the label map); remaining columns are
    /// `key=value` pairs (§6 labels-file format). `--remove-first-label` additionally drops
    /// the second column as an operator convention.
    fn load_labels(
        &self,
        path: &str,
        known_pubkeys: &BTreeSet<Pubkey>,
    ) -> Result<HashMap<Pubkey, HashMap<String, String>>> {
        let mut labels = HashMap::new();
        for line in read_nonempty_lines(path)? {
            let mut columns: Vec<&str> = line.split(',').collect();
            if columns.is_empty() {
                continue;
            }
            let pubkey_raw = columns.remove(0);
            let pubkey = Pubkey::parse(pubkey_raw)
                .with_context(|| format!("invalid pubkey {pubkey_raw:?} in {path}"))?;
            if self.remove_first_label && !columns.is_empty() {
                columns.remove(0);
            }
            labels.insert(pubkey, parse_label_pairs(&columns));
        }
        for pubkey in known_pubkeys {
            labels.entry(*pubkey).or_default();
        }
        Ok(labels)
    }
}

fn read_nonempty_lines(path: &str) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pubkey(byte: u8) -> String {
        format!("0x{}", hex::encode([byte; 48]))
    }

    #[tokio::test]
    async fn loads_pubkeys_from_file_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", pubkey(1)).unwrap();
        writeln!(file, "{}", pubkey(2)).unwrap();

        let loader = WatchedSetLoader::new(
            Some(file.path().to_str().unwrap().to_owned()),
            None,
            false,
            None,
            reqwest::Client::new(),
        );
        let set = loader.load().await.unwrap();
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn invalid_pubkey_in_file_fails_the_whole_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not-a-pubkey").unwrap();

        let loader = WatchedSetLoader::new(
            Some(file.path().to_str().unwrap().to_owned()),
            None,
            false,
            None,
            reqwest::Client::new(),
        );
        assert!(loader.load().await.is_err());
    }

    #[tokio::test]
    async fn labels_file_assigns_key_value_pairs_per_pubkey() {
        let mut pk_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(pk_file, "{}", pubkey(3)).unwrap();

        let mut labels_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(labels_file, "{},team=infra,region=eu", pubkey(3)).unwrap();

        let loader = WatchedSetLoader::new(
            Some(pk_file.path().to_str().unwrap().to_owned()),
            Some(labels_file.path().to_str().unwrap().to_owned()),
            false,
            None,
            reqwest::Client::new(),
        );
        let set = loader.load().await.unwrap();
        let pk = Pubkey::parse(&pubkey(3)).unwrap();
        let labels = set.labels_for(&pk).unwrap();
        assert_eq!(labels.get("team"), Some(&"infra".to_owned()));
    }
}
