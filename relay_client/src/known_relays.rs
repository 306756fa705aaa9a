//! The well-known `url -> display name` table (§4.4): "a well-known mapping url -> display
//! name (6 entries; unknown URLs are tolerated but metrics drop the display-name label)".

/// Host substrings are matched rather than exact URLs, since operators configure relays with
/// or without an embedded pubkey/scheme.
const KNOWN_RELAYS: [(&str, &str); 6] = [
    ("boost-relay.flashbots.net", "flashbots"),
    ("bloxroute.max-profit.blxrbdn.com", "bloxroute-max-profit"),
    ("bloxroute.ethical.blxrbdn.com", "bloxroute-ethical"),
    ("bloxroute.regulated.blxrbdn.com", "bloxroute-regulated"),
    ("relay.ultrasound.money", "ultrasound"),
    ("agnostic-relay.net", "agnostic"),
];

/// Looks up the display name for a relay base URL. `None` for unrecognised relays, which
/// still participate normally but carry no `mev_relay` label value beyond their raw host.
pub fn display_name(relay_url: &str) -> Option<&'static str> {
    KNOWN_RELAYS
        .iter()
        .find(|(host, _)| relay_url.contains(host))
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_flashbots() {
        assert_eq!(
            display_name("https://0xac6e@boost-relay.flashbots.net"),
            Some("flashbots")
        );
    }

    #[test]
    fn unknown_url_has_no_display_name() {
        assert_eq!(display_name("https://my-private-relay.example"), None);
    }
}
