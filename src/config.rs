//! Node configuration parameters
//!
//! All tunable parameters for one puzzle node. Values ship as defaults and
//! can be overridden from a JSON file at startup; everything is fixed for
//! the life of the process after that.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Core node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Identity ---
    /// Node identifier, used as the topic segment for this node
    pub node_id: String,
    /// Role reported in the ping payload ("puzzle", "media", ...)
    pub role: String,

    // --- Puzzle ---
    /// Re-arm straight into Active after every Reset
    pub always_active: bool,

    // --- Liveness ---
    /// Ping publish interval (seconds)
    pub ping_interval_secs: f32,
    /// Bus keep-alive negotiated at connect (seconds)
    pub keep_alive_secs: u16,

    // --- Reconnect backoff ---
    /// First retry delay after a failed connect (seconds)
    pub backoff_base_secs: u16,
    /// Retry delay ceiling (seconds)
    pub backoff_cap_secs: u16,

    // --- Timing ---
    /// Bench poll loop pacing (milliseconds); the library itself never sleeps
    pub poll_interval_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Identity
            node_id: "node".to_string(),
            role: "puzzle".to_string(),

            // Puzzle
            always_active: false,

            // Liveness
            ping_interval_secs: 3.0, // room dashboards expect ~3 s cadence
            keep_alive_secs: 15,

            // Reconnect backoff
            backoff_base_secs: 2,
            backoff_cap_secs: 30,

            // Timing
            poll_interval_ms: 25, // 40 Hz
        }
    }
}

impl NodeConfig {
    /// Parse a config from its JSON form. Missing fields fall back to the
    /// defaults; the result is validated before being returned.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw)
            .map_err(|_| ConfigError::InvalidFormat("config file is not valid JSON"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the topic scheme or the link cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(ConfigError::InvalidNodeId("must not be empty"));
        }
        if self.node_id.contains(['/', '+', '#']) {
            return Err(ConfigError::InvalidNodeId(
                "must not contain topic separators or wildcards",
            ));
        }
        if self.ping_interval_secs <= 0.0 {
            return Err(ConfigError::InvalidInterval("ping interval must be positive"));
        }
        if self.backoff_base_secs == 0 {
            return Err(ConfigError::InvalidInterval("backoff base must be positive"));
        }
        if self.backoff_base_secs > self.backoff_cap_secs {
            return Err(ConfigError::InvalidInterval("backoff base exceeds cap"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = NodeConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.ping_interval_secs > 0.0);
        assert!(c.backoff_base_secs < c.backoff_cap_secs);
        assert!(c.keep_alive_secs > c.ping_interval_secs as u16);
        assert!(c.poll_interval_ms > 0);
    }

    #[test]
    fn serde_roundtrip() {
        let c = NodeConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: NodeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.node_id, c2.node_id);
        assert_eq!(c.keep_alive_secs, c2.keep_alive_secs);
        assert!((c.ping_interval_secs - c2.ping_interval_secs).abs() < 0.001);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = NodeConfig::from_json(r#"{"node_id": "fuel-pump"}"#).unwrap();
        assert_eq!(c.node_id, "fuel-pump");
        assert_eq!(c.backoff_cap_secs, NodeConfig::default().backoff_cap_secs);
    }

    #[test]
    fn rejects_wildcard_node_id() {
        let mut c = NodeConfig::default();
        c.node_id = "room/1".to_string();
        assert!(matches!(c.validate(), Err(ConfigError::InvalidNodeId(_))));
        c.node_id = "a+b".to_string();
        assert!(c.validate().is_err());
        c.node_id = String::new();
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_inverted_backoff_bounds() {
        let mut c = NodeConfig::default();
        c.backoff_base_secs = 60;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidInterval(_))));
        c.backoff_base_secs = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn keep_alive_outlives_ping_interval() {
        let c = NodeConfig::default();
        assert!(
            f32::from(c.keep_alive_secs) > c.ping_interval_secs * 2.0,
            "keep-alive must comfortably outlast the ping cadence"
        );
    }
}
