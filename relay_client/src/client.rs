//! Multi-relay MEV verification (§4.4): the per-block builder check and the upcoming-proposer
//! registration check, both built on the shared [`http_retry`] transport.

use std::collections::HashSet;

use error_utils::{HttpError, ProtocolError};
use tracing::warn;
use types::{Pubkey, RelayPayload, Slot};

use crate::known_relays::display_name;
use crate::wire::{BidTrace, RegisteredValidatorEntry};

/// One configured relay: its base URL and, if recognised, its well-known display name.
pub struct Relay {
    pub base_url: String,
    pub display_name: Option<&'static str>,
}

impl Relay {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let display_name = display_name(&base_url);
        Self {
            base_url,
            display_name,
        }
    }

    /// Label value used on the `mev_relay` metric axis: the display name if known, else the
    /// raw host (unrecognised relays still get a usable, if less friendly, label).
    pub fn label(&self) -> &str {
        self.display_name.unwrap_or(&self.base_url)
    }
}

pub struct RelayClient {
    http: reqwest::Client,
    relays: Vec<Relay>,
}

/// One relay's answer to the per-block builder check, or a record of reaching no one.
pub struct BuilderCheck {
    /// `(payload, relay label)` for every relay that returned a bid for the slot.
    pub payloads: Vec<(RelayPayload, String)>,
}

impl RelayClient {
    pub fn new(http: reqwest::Client, relay_urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            http,
            relays: relay_urls.into_iter().map(Relay::new).collect(),
        }
    }

    /// Per-block builder check (`process`, §4.4): queries every relay's
    /// `bidtraces/proposer_payload_delivered` for `slot`. A relay answering with more than one
    /// record is a hard protocol error; no relay answering is reported via an empty result so
    /// the caller can bump the bad-relay counter and log the "unknown builder" line.
    pub async fn process(&self, slot: Slot) -> Result<BuilderCheck, ProtocolError> {
        let mut payloads = Vec::new();
        for relay in &self.relays {
            let url = format!(
                "{}/relay/v1/data/bidtraces/proposer_payload_delivered?slot={slot}",
                relay.base_url.trim_end_matches('/')
            );
            let traces: Vec<BidTrace> =
                match http_retry::get_json(&self.http, &url, &relay.base_url).await {
                    Ok(traces) => traces,
                    Err(HttpError::RetryExhausted { host }) => {
                        warn!(host, slot, "⚠️ Cannot contact {host}");
                        continue;
                    }
                    Err(_) => continue,
                };

            match traces.len() {
                0 => continue,
                1 => {
                    let trace = &traces[0];
                    let payload = RelayPayload {
                        slot: trace.slot,
                        value_wei: trace.value,
                        proposer_pubkey: trace.proposer_pubkey,
                    };
                    payloads.push((payload, relay.label().to_owned()));
                }
                count => {
                    return Err(ProtocolError::MultipleBidsForSlot {
                        relay: relay.label().to_owned(),
                        slot,
                        count,
                    })
                }
            }
        }
        Ok(BuilderCheck { payloads })
    }

    /// Upcoming-proposer registration check (§4.4): one `builder/validators` call per relay,
    /// returning the `(slot, pubkey)` pairs from `upcoming` seen by **no** relay.
    pub async fn check_validator_registration_for_slots(
        &self,
        upcoming: &[(Slot, Pubkey)],
    ) -> Vec<(Slot, Pubkey)> {
        let mut registered: HashSet<(Slot, Pubkey)> = HashSet::new();
        for relay in &self.relays {
            let url = format!(
                "{}/relay/v1/builder/validators",
                relay.base_url.trim_end_matches('/')
            );
            let entries: Vec<RegisteredValidatorEntry> =
                match http_retry::get_json(&self.http, &url, &relay.base_url).await {
                    Ok(entries) => entries,
                    Err(HttpError::RetryExhausted { host }) => {
                        warn!(host, "⚠️ Cannot contact {host}");
                        continue;
                    }
                    Err(_) => continue,
                };
            for entry in entries {
                registered.insert((entry.slot, entry.entry.message.pubkey));
            }
        }

        upcoming
            .iter()
            .filter(|pair| !registered.contains(pair))
            .copied()
            .collect()
    }
}
