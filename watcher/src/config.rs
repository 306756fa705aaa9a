//! CLI & configuration (§4.7, §6): a `WatcherConfig` built once from `clap::Parser`, validated
//! before the orchestrator is constructed.

use std::collections::HashMap;

use clap::Parser;
use error_utils::ConfigError;
use types::ExecutionAddress;

use beacon_client::BeaconType;

#[derive(Parser, Debug)]
#[command(name = "validator-watcher", about = "Ethereum validator monitoring daemon")]
pub struct Cli {
    #[arg(long)]
    pub beacon_url: String,

    #[arg(long)]
    pub execution_url: Option<String>,

    #[arg(long)]
    pub pubkeys_file_path: Option<String>,

    #[arg(long)]
    pub labels_file_path: Option<String>,

    #[arg(long, default_value_t = false)]
    pub remove_first_label: bool,

    #[arg(long)]
    pub web3signer_url: Option<String>,

    #[arg(long = "fee-recipient")]
    pub fee_recipients: Vec<String>,

    #[arg(long)]
    pub slack_channel: Option<String>,

    #[arg(long, value_enum, default_value = "other")]
    pub beacon_type: BeaconType,

    #[arg(long = "relay-url")]
    pub relay_urls: Vec<String>,

    #[arg(long)]
    pub liveness_file: Option<String>,
}

/// The resolved, validated configuration the orchestrator is built from.
pub struct WatcherConfig {
    pub beacon_url: String,
    pub execution_url: Option<String>,
    pub pubkeys_file_path: Option<String>,
    pub labels_file_path: Option<String>,
    pub remove_first_label: bool,
    pub web3signer_url: Option<String>,
    pub fee_recipients: Vec<ExecutionAddress>,
    pub slack_channel: Option<String>,
    pub slack_token: Option<String>,
    pub beacon_type: BeaconType,
    pub relay_urls: Vec<String>,
    pub liveness_file: Option<String>,
}

impl WatcherConfig {
    /// Builds and validates from parsed CLI flags plus the process environment. `--execution-url`
    /// is required iff at least one `--fee-recipient` is given; `SLACK_TOKEN` is required iff
    /// `--slack-channel` is given (§4.7).
    pub fn from_cli(cli: Cli, slack_token: Option<String>) -> Result<Self, ConfigError> {
        if !cli.fee_recipients.is_empty() && cli.execution_url.is_none() {
            return Err(ConfigError::MissingExecutionUrl);
        }
        if cli.slack_channel.is_some() && slack_token.is_none() {
            return Err(ConfigError::MissingSlackToken);
        }

        let fee_recipients = cli
            .fee_recipients
            .iter()
            .map(|raw| {
                ExecutionAddress::parse(raw)
                    .map_err(|source| ConfigError::InvalidFeeRecipient(raw.clone(), source))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for relay_url in &cli.relay_urls {
            url::Url::parse(relay_url)
                .map_err(|source| ConfigError::InvalidRelayUrl(relay_url.clone(), source))?;
        }

        Ok(Self {
            beacon_url: cli.beacon_url,
            execution_url: cli.execution_url,
            pubkeys_file_path: cli.pubkeys_file_path,
            labels_file_path: cli.labels_file_path,
            remove_first_label: cli.remove_first_label,
            web3signer_url: cli.web3signer_url,
            fee_recipients,
            slack_channel: cli.slack_channel,
            slack_token,
            beacon_type: cli.beacon_type,
            relay_urls: cli.relay_urls,
            liveness_file: cli.liveness_file,
        })
    }
}

/// `key=value` label pairs parsed from one row of the labels file, after the mandatory pubkey
/// column (optionally dropped via `--remove-first-label`) is stripped off.
pub fn parse_label_pairs(columns: &[&str]) -> HashMap<String, String> {
    columns
        .iter()
        .filter_map(|col| col.split_once('='))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli(beacon_url: &str) -> Cli {
        Cli {
            beacon_url: beacon_url.to_owned(),
            execution_url: None,
            pubkeys_file_path: None,
            labels_file_path: None,
            remove_first_label: false,
            web3signer_url: None,
            fee_recipients: vec![],
            slack_channel: None,
            beacon_type: BeaconType::Other,
            relay_urls: vec![],
            liveness_file: None,
        }
    }

    #[test]
    fn fee_recipient_without_execution_url_is_rejected() {
        let mut cli = base_cli("http://beacon");
        cli.fee_recipients = vec!["0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_owned()];
        let result = WatcherConfig::from_cli(cli, None);
        assert!(matches!(result, Err(ConfigError::MissingExecutionUrl)));
    }

    #[test]
    fn slack_channel_without_token_is_rejected() {
        let mut cli = base_cli("http://beacon");
        cli.slack_channel = Some("#alerts".to_owned());
        let result = WatcherConfig::from_cli(cli, None);
        assert!(matches!(result, Err(ConfigError::MissingSlackToken)));
    }

    #[test]
    fn valid_config_parses_fee_recipients() {
        let mut cli = base_cli("http://beacon");
        cli.execution_url = Some("http://execution".to_owned());
        cli.fee_recipients = vec!["0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_owned()];
        let config = WatcherConfig::from_cli(cli, None).unwrap();
        assert_eq!(config.fee_recipients.len(), 1);
    }

    #[test]
    fn parses_label_columns_into_pairs() {
        let pairs = parse_label_pairs(&["team=infra", "region=eu"]);
        assert_eq!(pairs.get("team"), Some(&"infra".to_owned()));
        assert_eq!(pairs.get("region"), Some(&"eu".to_owned()));
    }
}
