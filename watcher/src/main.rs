//! Entry point (§5, §6): parses configuration, wires up every HTTP client, and runs the
//! orchestrator until Ctrl-C or a fatal startup/runtime error.

mod classifier;
mod clock;
mod config;
mod execution;
mod liveness;
mod metric_labels;
mod metrics_server;
mod orchestrator;
mod price;
mod watched_set_loader;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use beacon_client::BeaconClient;
use config::{Cli, WatcherConfig};
use execution::{ExecutionClient, JsonRpcExecutionClient};
use metrics::MetricsRegistry;
use notifier::Notifier;
use orchestrator::Orchestrator;
use price::HttpPriceFeedClient;
use relay_client::RelayClient;
use watched_set_loader::WatchedSetLoader;

const KRAKEN_ETH_USD_TRADES_URL: &str = "https://api.kraken.com/0/public/Trades?pair=ETHUSD";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let slack_token = std::env::var("SLACK_TOKEN").ok();
    let config = WatcherConfig::from_cli(cli, slack_token).context("invalid configuration")?;

    let http = reqwest::Client::new();
    let beacon = BeaconClient::new(http.clone(), config.beacon_url.clone(), config.beacon_type);

    let relay = (!config.relay_urls.is_empty())
        .then(|| RelayClient::new(http.clone(), config.relay_urls.clone()));

    let execution: Option<Box<dyn ExecutionClient>> = config
        .execution_url
        .clone()
        .map(|url| Box::new(JsonRpcExecutionClient::new(http.clone(), url)) as Box<dyn ExecutionClient>);

    let price = Box::new(HttpPriceFeedClient::new(http.clone(), KRAKEN_ETH_USD_TRADES_URL));

    let notifier = Notifier::new(http.clone(), config.slack_channel.clone(), config.slack_token.clone());
    let metrics = Arc::new(MetricsRegistry::new());

    let loader = WatchedSetLoader::new(
        config.pubkeys_file_path.clone(),
        config.labels_file_path.clone(),
        config.remove_first_label,
        config.web3signer_url.clone(),
        http.clone(),
    );

    let mut orchestrator = Orchestrator::new(config, beacon, relay, execution, price, notifier, metrics, loader);

    tokio::select! {
        result = orchestrator.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, exiting");
            Ok(())
        }
    }
}
