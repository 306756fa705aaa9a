//! Lifecycle notifier (§4.3, C8): an emoji-prefixed console log per event, plus a single chat
//! POST per alert when a Slack channel is configured (§6 "Chat"). Console logging always runs;
//! chat is best-effort and never escalates to a fatal error — a failed chat POST is logged and
//! swallowed, since losing a notification is not worth aborting the probe loop over.

use tracing::{info, warn};
use types::{Epoch, ExecutionAddress, Pubkey, Slot};

struct SlackConfig {
    token: String,
    channel: String,
}

/// Emits the console + optional chat alerts named across §4.3's probe descriptions.
pub struct Notifier {
    http: reqwest::Client,
    slack: Option<SlackConfig>,
}

impl Notifier {
    pub fn new(http: reqwest::Client, slack_channel: Option<String>, slack_token: Option<String>) -> Self {
        let slack = match (slack_channel, slack_token) {
            (Some(channel), Some(token)) => Some(SlackConfig { token, channel }),
            _ => None,
        };
        Self { http, slack }
    }

    async fn send_chat(&self, text: &str) {
        let Some(slack) = &self.slack else { return };
        let result = self
            .http
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&slack.token)
            .json(&serde_json::json!({ "channel": slack.channel, "text": text }))
            .send()
            .await;
        if let Err(source) = result {
            warn!(%source, "failed to deliver chat notification");
        }
    }

    /// ExitedValidators (§4.3): newly-exited or newly-withdrawable watched pubkey.
    pub async fn exited_validator(&self, pubkey: &Pubkey, withdrawable: bool) {
        let verb = if withdrawable { "became withdrawable" } else { "exited" };
        let text = format!("🚪 validator {} {verb}", pubkey.short());
        info!("{text}");
        self.send_chat(&text).await;
    }

    /// SlashedValidators (§4.3): chat only for our own watched validators.
    pub async fn slashed_validator(&self, pubkey: &Pubkey, ours: bool) {
        let text = format!("🔪 validator {} slashed", pubkey.short());
        info!("{text}");
        if ours {
            self.send_chat(&text).await;
        }
    }

    /// DoubleMissedAttestations (§4.3): `curr_missed ∩ prev_missed`, non-empty at `epoch >= 2`.
    pub async fn double_missed_attestations(&self, pubkeys: &[Pubkey], epoch: Epoch) {
        let names: Vec<_> = pubkeys.iter().map(Pubkey::short).collect();
        let text = format!("👻 double-missed attestations at epoch {epoch}: {}", names.join(", "));
        info!("{text}");
        self.send_chat(&text).await;
    }

    /// FeeRecipient mismatch (§4.3): configured address differs from the block's payload.
    pub async fn fee_recipient_mismatch(
        &self,
        pubkey: &Pubkey,
        slot: Slot,
        expected: &ExecutionAddress,
        actual: &ExecutionAddress,
    ) {
        let text = format!(
            "🧾 fee recipient mismatch for {} at slot {slot}: expected {expected}, got {actual}",
            pubkey.short()
        );
        warn!("{text}");
        self.send_chat(&text).await;
    }

    /// MissedBlockHead (§4.3/S3): our proposer duty resolved to no block at the head.
    pub async fn missed_block_head(&self, pubkey: &Pubkey, slot: Slot) {
        let text = format!("🧱 missed block head for {} at slot {slot}", pubkey.short());
        warn!("{text}");
        self.send_chat(&text).await;
    }

    /// MissedBlockFinalized (§4.3): a head miss confirmed finalized by the catch-up cursor.
    /// Distinct text from [`Self::missed_block_head`] — the chain has now committed to the miss.
    pub async fn missed_block_finalized(&self, pubkey: &Pubkey, slot: Slot) {
        let text = format!("🪦 missed block finalized for {} at slot {slot}", pubkey.short());
        warn!("{text}");
        self.send_chat(&text).await;
    }

    /// Relay `process` found no relay willing to claim the block's builder (§4.4/S4). Console
    /// only — not part of the chat-eligible event list.
    pub fn unknown_builder(&self, slot: Slot) {
        warn!(slot, "🏗️ unknown builder (possibly local)");
    }

    /// Upcoming-proposer registration check found a watched pubkey unregistered with every
    /// configured relay (§4.4/S6). Console only.
    pub fn proposer_not_registered(&self, pubkey: &Pubkey, slot: Slot) {
        warn!(
            slot,
            "📝 validator {} not registered to any MEV relay for slot {slot}",
            pubkey.short()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_with_no_slack_config_has_no_slack() {
        let notifier = Notifier::new(reqwest::Client::new(), None, None);
        assert!(notifier.slack.is_none());
    }

    #[test]
    fn notifier_requires_both_channel_and_token() {
        let notifier = Notifier::new(reqwest::Client::new(), Some("#alerts".to_owned()), None);
        assert!(notifier.slack.is_none());
    }

    #[tokio::test]
    async fn unconfigured_notifier_chat_send_is_a_noop() {
        let notifier = Notifier::new(reqwest::Client::new(), None, None);
        notifier.send_chat("test").await;
    }
}
