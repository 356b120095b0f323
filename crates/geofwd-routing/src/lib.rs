//! # Geofwd Routing
//!
//! Neighbor tracking and position-aware forwarding decisions for multi-hop
//! wireless networks with name-based addressing.
//!
//! Nodes move and no stable routing table exists. Each hop decides where a
//! request goes from its own position, the positions its neighbors last
//! reported, and the location metadata carried by the request.
//!
//! ## Strategies
//!
//! - [`BestNeighborStrategy`]: hand the request to the neighbor(s) closest
//!   to the content that are also moving toward it, naming them in a relay
//!   set
//! - [`ForwardingZoneStrategy`]: flood inside a corridor between requester
//!   and content, reject outside it
//! - [`NeighborhoodStrategy`]: flood discovery requests and learn neighbors
//!   from discovery replies
//!
//! Every strategy first applies the relay-set gate ([`check_relay_gate`]).
//! Strategies return a [`Decision`]; [`apply_decision`] carries it out
//! through a [`ForwarderHost`]. [`receive_request`] does both for a request
//! whose tags are still encoded, dropping it if they do not decode.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use geofwd_routing::{BestNeighborStrategy, ForwardingStrategy, GeoForwardConfig, NeighborTable};
//!
//! let config = GeoForwardConfig::default();
//! let table = Arc::new(NeighborTable::new());
//! let strategy = BestNeighborStrategy::new(table.clone(), config.best_neighbor.clone());
//!
//! let decision = strategy.after_receive_request(&node, inbound, &request, &host)?;
//! apply_decision(&host, inbound.face, &request, &decision)?;
//! ```
//!
//! ## Architecture
//!
//! - [`table`]: neighbor table with generational handles and expiry timers
//! - [`host`]: the forwarder contract and an in-memory recording host
//! - [`suppression`]: retransmission suppression
//! - [`gate`]: relay-set gate
//! - [`decision`]: decisions and their execution
//! - [`strategy`]: the common strategy interface
//! - [`best_neighbor`], [`zone`], [`neighborhood`]: the strategies
//! - [`discovery`]: the per-node discovery application
//! - [`error`]: routing error types

pub mod best_neighbor;
pub mod decision;
pub mod discovery;
pub mod error;
pub mod gate;
pub mod host;
pub mod neighborhood;
pub mod strategy;
pub mod suppression;
pub mod table;
pub mod zone;

// Re-export main types
pub use best_neighbor::{select_best_relays, BestNeighborConfig, BestNeighborStrategy};
pub use decision::{apply_decision, apply_reply_decision, Decision, DropReason, RejectReason};
pub use discovery::{DiscoveryConfig, DiscoveryResponder, RequestSink};
pub use error::{RoutingError, RoutingResult};
pub use gate::{check_relay_gate, GateOutcome};
pub use host::{ForwarderHost, HostAction, RecordingHost};
pub use neighborhood::{NeighborConfig, NeighborhoodStrategy};
pub use strategy::{is_eligible, receive_request, ForwardingStrategy, LocalNode};
pub use suppression::{
    ExponentialRetxSuppression, RetxSuppression, SuppressionConfig, SuppressionResult,
};
pub use table::{EntryHandle, NeighborEntry, NeighborTable};
pub use zone::{in_zone, ForwardingZoneStrategy, ZoneConfig};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for every forwarding component of a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoForwardConfig {
    /// Best-neighbor relay selection
    pub best_neighbor: BestNeighborConfig,
    /// Forwarding-zone shape
    pub zone: ZoneConfig,
    /// Retransmission suppression
    pub suppression: SuppressionConfig,
    /// Neighbor table lifetimes
    pub neighbor: NeighborConfig,
    /// Neighbor discovery
    pub discovery: DiscoveryConfig,
}

impl GeoForwardConfig {
    /// Create a config for dense, slow-moving networks
    ///
    /// Many neighbors are in range, so fewer relays are named per hop and
    /// discovery is more frequent with a narrower corridor.
    pub fn dense_urban() -> Self {
        Self {
            best_neighbor: BestNeighborConfig { relay_count: 1 },
            zone: ZoneConfig {
                width: 1.0,
                ..ZoneConfig::default()
            },
            suppression: SuppressionConfig {
                initial_interval: Duration::from_millis(20),
                multiplier: 2.0,
                max_interval: Duration::from_millis(500),
                record_timeout: Duration::from_secs(10),
            },
            neighbor: NeighborConfig {
                entry_lifetime: Duration::from_secs(3),
                reply_pending_expiry: Duration::from_secs(3),
            },
            discovery: DiscoveryConfig {
                period: Duration::from_secs(2),
                sample_period: Duration::from_secs(1),
                hop_limit: 1,
                request_lifetime: Duration::from_secs(2),
                ..DiscoveryConfig::default()
            },
        }
    }

    /// Create a config for sparse, fast-moving networks
    ///
    /// Neighbors are rare, so several relays are named per hop, the
    /// corridor is wider and neighbor entries live longer.
    pub fn sparse_highway() -> Self {
        Self {
            best_neighbor: BestNeighborConfig { relay_count: 3 },
            zone: ZoneConfig {
                width: 10.0,
                ..ZoneConfig::default()
            },
            suppression: SuppressionConfig::default(),
            neighbor: NeighborConfig {
                entry_lifetime: Duration::from_secs(10),
                reply_pending_expiry: Duration::from_secs(5),
            },
            discovery: DiscoveryConfig {
                period: Duration::from_secs(5),
                sample_period: Duration::from_secs(3),
                hop_limit: 3,
                request_lifetime: Duration::from_secs(5),
                ..DiscoveryConfig::default()
            },
        }
    }

    /// Validate configuration invariants
    ///
    /// Returns a list of warnings if the configuration has potential issues.
    /// An empty list means the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.best_neighbor.relay_count == 0 {
            warnings.push(ConfigWarning::ZeroRelayCount);
        }

        if !self.zone.width.is_finite() || self.zone.width <= 0.0 {
            warnings.push(ConfigWarning::InvalidZoneWidth);
        }

        if self.suppression.multiplier < 1.0 {
            warnings.push(ConfigWarning::ShrinkingSuppression);
        }
        if self.suppression.initial_interval > self.suppression.max_interval {
            warnings.push(ConfigWarning::InitialIntervalExceedsMax);
        }

        // Entries must outlive the discovery period or neighbors flap
        if self.neighbor.entry_lifetime < self.discovery.period {
            warnings.push(ConfigWarning::EntryLifetimeShorterThanPeriod);
        }

        if self.discovery.hop_limit == 0 {
            warnings.push(ConfigWarning::ZeroHopLimit);
        }
        if self.discovery.max_jitter >= self.discovery.period {
            warnings.push(ConfigWarning::JitterExceedsPeriod);
        }

        warnings
    }

    /// Check if the configuration is valid (no warnings)
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Configuration warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Best-neighbor selection would never name a relay
    ZeroRelayCount,
    /// Corridor width is zero, negative or not finite
    InvalidZoneWidth,
    /// Suppression multiplier is below 1
    ShrinkingSuppression,
    /// Initial suppression interval exceeds the maximum
    InitialIntervalExceedsMax,
    /// Neighbor entries expire before the next discovery round
    EntryLifetimeShorterThanPeriod,
    /// Discovery requests would never leave the node
    ZeroHopLimit,
    /// Send jitter is as long as the discovery period
    JitterExceedsPeriod,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::ZeroRelayCount => write!(f, "relay_count is 0"),
            ConfigWarning::InvalidZoneWidth => {
                write!(f, "zone width must be finite and positive")
            }
            ConfigWarning::ShrinkingSuppression => {
                write!(f, "suppression multiplier is below 1")
            }
            ConfigWarning::InitialIntervalExceedsMax => {
                write!(f, "initial_interval exceeds max_interval")
            }
            ConfigWarning::EntryLifetimeShorterThanPeriod => {
                write!(f, "entry_lifetime is shorter than the discovery period")
            }
            ConfigWarning::ZeroHopLimit => write!(f, "discovery hop_limit is 0"),
            ConfigWarning::JitterExceedsPeriod => {
                write!(f, "max_jitter is not shorter than the discovery period")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeoForwardConfig::default();
        assert_eq!(config.best_neighbor.relay_count, 1);
        assert_eq!(config.zone.width, 2.0);
        assert_eq!(config.zone.area_precision, 2);
        assert_eq!(config.neighbor.entry_lifetime, Duration::from_secs(5));
        assert_eq!(config.discovery.prefix, "/neighbor");
        assert_eq!(config.discovery.max_jitter, Duration::from_millis(90));
    }

    #[test]
    fn test_preset_configs_are_valid() {
        assert!(GeoForwardConfig::default().is_valid());
        assert!(GeoForwardConfig::dense_urban().is_valid());
        assert!(GeoForwardConfig::sparse_highway().is_valid());
    }

    #[test]
    fn test_presets_differ() {
        let dense = GeoForwardConfig::dense_urban();
        let sparse = GeoForwardConfig::sparse_highway();
        assert!(dense.zone.width < sparse.zone.width);
        assert!(dense.best_neighbor.relay_count < sparse.best_neighbor.relay_count);
    }

    #[test]
    fn test_invalid_config_detected() {
        let mut config = GeoForwardConfig::default();
        config.best_neighbor.relay_count = 0;
        config.zone.width = f64::NAN;
        config.neighbor.entry_lifetime = Duration::from_secs(1);

        let warnings = config.validate();
        assert!(warnings.contains(&ConfigWarning::ZeroRelayCount));
        assert!(warnings.contains(&ConfigWarning::InvalidZoneWidth));
        assert!(warnings.contains(&ConfigWarning::EntryLifetimeShorterThanPeriod));
        assert!(!config.is_valid());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = GeoForwardConfig::sparse_highway();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GeoForwardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_warning_display() {
        assert_eq!(ConfigWarning::ZeroRelayCount.to_string(), "relay_count is 0");
    }
}
