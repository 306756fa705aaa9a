//! Shared error taxonomy (§7): every outbound HTTP caller and the orchestrator reuse these
//! variants instead of inventing ad hoc error enums per crate.

use thiserror::Error;

/// Startup misconfiguration — always fatal (§7).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("--execution-url is required when --fee-recipient is given")]
    MissingExecutionUrl,
    #[error("SLACK_TOKEN must be set when --slack-channel is given")]
    MissingSlackToken,
    #[error("invalid fee recipient address {0:?}: {1}")]
    InvalidFeeRecipient(String, hex::FromHexError),
    #[error("invalid relay URL {0:?}: {1}")]
    InvalidRelayUrl(String, url::ParseError),
}

/// Transient/remote HTTP failures (§7). `Transient` is handled by the retry transport;
/// `RemoteServerError` bubbles to the caller probe, which skips the current slot.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("connection error contacting {host}: {source}")]
    Connection {
        host: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{host} returned 404")]
    NotFound { host: String },
    #[error("exhausted retries contacting {host}")]
    RetryExhausted { host: String },
    #[error("{host} returned server error {status}")]
    RemoteServerError { host: String, status: u16 },
    #[error("failed to decode response from {host}: {source}")]
    Decode {
        host: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Hard protocol assertions (§7): relay returned more than one bid for a slot, or a metrics
/// family was asked to register a second, conflicting label schema.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("relay {relay} returned {count} bids for slot {slot}, expected at most 1")]
    MultipleBidsForSlot {
        relay: String,
        slot: u64,
        count: usize,
    },
    #[error("metric family {family} already has schema {existing:?}, cannot register {attempted:?}")]
    SchemaConflict {
        family: String,
        existing: Vec<String>,
        attempted: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_messages_name_the_host() {
        let err = HttpError::RetryExhausted {
            host: "http://beacon".to_owned(),
        };
        assert!(err.to_string().contains("http://beacon"));
    }
}
