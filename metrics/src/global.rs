use prometheus::{Gauge, IntCounter, IntGauge, Registry};

/// Simple gauges/counters with no labels, created once at start (§4.5).
pub struct GlobalMetrics {
    pub net_active_validators: IntGauge,
    pub net_pending_queued_validators: IntGauge,
    pub our_active_validators: IntGauge,
    pub our_pending_queued_validators: IntGauge,
    pub missed_attestations_count: IntGauge,
    pub double_missed_attestations_count: IntGauge,
    pub entry_queue_duration_seconds: Gauge,
    pub eth_usd_price: Gauge,
    pub bad_relay_count: IntCounter,
    pub network_ideal_rewards: IntCounter,
    pub network_actual_rewards: IntCounter,
    pub our_ideal_rewards: IntCounter,
    pub our_actual_rewards: IntCounter,
    pub our_suboptimal_rate: Gauge,
    pub network_suboptimal_rate: Gauge,
    pub future_proposals_count: IntGauge,
    pub unregistered_proposals_count: IntGauge,
}

impl GlobalMetrics {
    pub fn register(registry: &Registry) -> Self {
        macro_rules! gauge {
            ($name:expr, $help:expr) => {{
                let g = IntGauge::new($name, $help).expect("valid metric spec");
                registry.register(Box::new(g.clone())).expect("no name collision");
                g
            }};
        }
        macro_rules! fgauge {
            ($name:expr, $help:expr) => {{
                let g = Gauge::new($name, $help).expect("valid metric spec");
                registry.register(Box::new(g.clone())).expect("no name collision");
                g
            }};
        }
        macro_rules! counter {
            ($name:expr, $help:expr) => {{
                let c = IntCounter::new($name, $help).expect("valid metric spec");
                registry.register(Box::new(c.clone())).expect("no name collision");
                c
            }};
        }

        Self {
            net_active_validators: gauge!("net_active_validators", "Total active validators on the network"),
            net_pending_queued_validators: gauge!(
                "net_pending_queued_validators",
                "Total pending-queued validators on the network"
            ),
            our_active_validators: gauge!("our_active_validators", "Active validators in the watched set"),
            our_pending_queued_validators: gauge!(
                "our_pending_queued_validators",
                "Pending-queued validators in the watched set"
            ),
            missed_attestations_count: gauge!(
                "missed_attestations_count",
                "Watched validators that missed an attestation in the last processed epoch"
            ),
            double_missed_attestations_count: gauge!(
                "double_missed_attestations_count",
                "Watched validators that missed attestations in two consecutive epochs"
            ),
            entry_queue_duration_seconds: fgauge!(
                "entry_queue_duration_seconds",
                "Estimated time to activation for a validator entering the queue now"
            ),
            eth_usd_price: fgauge!("eth_usd_price", "Last observed ETH/USD spot price"),
            bad_relay_count: counter!(
                "bad_relay_count",
                "Blocks whose builder could not be attributed to any configured relay"
            ),
            network_ideal_rewards: counter!("network_ideal_rewards_total", "Network-wide ideal attestation rewards"),
            network_actual_rewards: counter!("network_actual_rewards_total", "Network-wide actual attestation rewards"),
            our_ideal_rewards: counter!("our_ideal_rewards_total", "Watched-set ideal attestation rewards"),
            our_actual_rewards: counter!("our_actual_rewards_total", "Watched-set actual attestation rewards"),
            our_suboptimal_rate: fgauge!("our_suboptimal_rate", "Fraction of watched validators with suboptimal rewards"),
            network_suboptimal_rate: fgauge!(
                "network_suboptimal_rate",
                "Fraction of network validators with suboptimal rewards"
            ),
            future_proposals_count: gauge!(
                "future_proposals_count",
                "Upcoming proposal duties belonging to the watched set"
            ),
            unregistered_proposals_count: gauge!(
                "unregistered_proposals_count",
                "Upcoming watched proposers not registered with any relay"
            ),
        }
    }
}
