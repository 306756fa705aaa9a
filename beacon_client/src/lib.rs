//! HTTP client for the beacon node side of the external interface (§6, C11).

pub mod beacon_type;
pub mod client;
pub mod wire;

pub use beacon_type::BeaconType;
pub use client::{BeaconClient, RewardTriple};
