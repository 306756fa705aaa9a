//! MEV relay verification client (§4.4, C7).

pub mod client;
pub mod known_relays;
pub mod wire;

pub use client::{BuilderCheck, Relay, RelayClient};
pub use known_relays::display_name;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_label_falls_back_to_host_for_unknown_relay() {
        let relay = Relay::new("https://my-private-relay.example");
        assert_eq!(relay.label(), "https://my-private-relay.example");
    }

    #[test]
    fn relay_label_uses_display_name_when_known() {
        let relay = Relay::new("https://0xac6e@boost-relay.flashbots.net");
        assert_eq!(relay.label(), "flashbots");
    }
}
