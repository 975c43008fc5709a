//! Scout configuration
//!
//! All knobs the engine consumes, built once at process start and passed by
//! reference. No global mutable state: the seed list override comes from an
//! environment variable read during construction, replacing (not appending
//! to) the compiled-in defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::PeerAddress;

/// Environment variable holding a comma-separated seed list override
pub const SEED_NODES_ENV: &str = "PODNET_SEED_NODES";

/// Resource key the full snapshot is cached under
pub const PEER_LIST_KEY: &str = "peer-list";

/// Compiled-in seed addresses, used when no override is present
pub const DEFAULT_SEED_NODES: [&str; 3] = [
    "seed1.podnet.io:8417",
    "seed2.podnet.io:8417",
    "seed3.podnet.io:8417",
];

/// Main configuration for the scout engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutConfig {
    // === Seeds ===

    /// Seed addresses (`host:port`, port optional) the traversal starts from
    pub seed_nodes: Vec<String>,

    /// Port assumed when a seed or announced address omits one
    pub default_peer_port: u16,

    // === Traversal ===

    /// Maximum gossip depth; 0 queries only the seeds themselves
    pub max_depth: u32,

    /// In-flight call cap for discovery rounds and probe batches
    pub batch_size: usize,

    /// Hard per-call timeout (milliseconds)
    pub call_timeout_ms: u64,

    /// Wall-clock cap on the discovery stage of one pass (seconds).
    /// Expiry keeps whatever was found so far; it is not an error.
    pub pass_deadline_secs: u64,

    // === Scoring ===

    /// Version pods must meet or exceed to count as compliant
    pub latest_version: String,

    /// Visibility sub-score applied when the fraction cannot be computed
    /// (fewer than two responders)
    pub default_visibility: u8,

    // === Caching ===

    /// How long a finished pass stays valid (seconds)
    pub cache_ttl_secs: u64,

    // === Geolocation ===

    /// Enable best-effort host geolocation during probes
    pub enable_geo: bool,

    /// URL prefix of the geolocation JSON service
    pub geo_endpoint: String,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            // Seeds
            seed_nodes: DEFAULT_SEED_NODES.iter().map(|s| s.to_string()).collect(),
            default_peer_port: 8417,

            // Traversal
            max_depth: 3,
            batch_size: 10,
            call_timeout_ms: 5000,
            pass_deadline_secs: 120,

            // Scoring
            latest_version: "0.5.0".to_string(),
            default_visibility: 100,

            // Caching
            cache_ttl_secs: 120,

            // Geolocation
            enable_geo: false,
            geo_endpoint: "http://ip-api.com/json".to_string(),
        }
    }
}

impl ScoutConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply the `PODNET_SEED_NODES` override if set.
    ///
    /// The override *replaces* the configured list; an empty or
    /// whitespace-only value is ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(SEED_NODES_ENV) {
            let seeds: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();

            if !seeds.is_empty() {
                self.seed_nodes = seeds;
            }
        }
        self
    }

    // Builder-style methods for CLI overrides

    pub fn with_seed_nodes(mut self, seeds: Vec<String>) -> Self {
        if !seeds.is_empty() {
            self.seed_nodes = seeds;
        }
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_call_timeout_ms(mut self, ms: u64) -> Self {
        self.call_timeout_ms = ms;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Parse the seed list into addresses, dropping malformed entries.
    pub fn seed_addresses(&self) -> Vec<PeerAddress> {
        self.seed_nodes
            .iter()
            .filter_map(|s| PeerAddress::parse(s, self.default_peer_port))
            .collect()
    }

    /// Per-call timeout as a `Duration`.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Cache TTL as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Discovery-stage deadline as a `Duration`.
    pub fn pass_deadline(&self) -> Duration {
        Duration::from_secs(self.pass_deadline_secs)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }

        if self.call_timeout_ms == 0 {
            anyhow::bail!("call_timeout_ms must be non-zero");
        }

        if self.pass_deadline_secs * 1000 < self.call_timeout_ms {
            anyhow::bail!(
                "pass_deadline_secs ({}) must cover at least one call timeout ({} ms)",
                self.pass_deadline_secs,
                self.call_timeout_ms
            );
        }

        if self.default_visibility > 100 {
            anyhow::bail!(
                "default_visibility ({}) must be within 0..=100",
                self.default_visibility
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScoutConfig::default();
        assert_eq!(config.call_timeout_ms, 5000);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.default_visibility, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScoutConfig::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = ScoutConfig::default();
        config.default_visibility = 150;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seed_address_parsing() {
        let config = ScoutConfig::default().with_seed_nodes(vec![
            "10.0.0.1:9000".to_string(),
            "10.0.0.2".to_string(),
            "".to_string(),
        ]);

        let addrs = config.seed_addresses();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0].port, 9000);
        assert_eq!(addrs[1].port, config.default_peer_port);
    }

    #[test]
    fn test_builder_methods() {
        let config = ScoutConfig::default()
            .with_max_depth(1)
            .with_call_timeout_ms(2500)
            .with_batch_size(4);

        assert_eq!(config.max_depth, 1);
        assert_eq!(config.call_timeout_ms, 2500);
        assert_eq!(config.batch_size, 4);
    }

    #[test]
    fn test_empty_seed_override_ignored() {
        let config = ScoutConfig::default().with_seed_nodes(vec![]);
        assert_eq!(config.seed_nodes.len(), DEFAULT_SEED_NODES.len());
    }

    #[test]
    fn test_env_override_replaces_seed_list() {
        // One test for both branches: env vars are process-global and the
        // harness runs tests in parallel
        std::env::set_var(SEED_NODES_ENV, "10.9.0.1:9000, 10.9.0.2 ,");
        let config = ScoutConfig::default().with_env_overrides();
        assert_eq!(config.seed_nodes, vec!["10.9.0.1:9000", "10.9.0.2"]);

        // The override replaces the defaults outright, never appends
        for default in DEFAULT_SEED_NODES {
            assert!(!config.seed_nodes.iter().any(|s| s == default));
        }

        // Whitespace-only override is ignored
        std::env::set_var(SEED_NODES_ENV, " , ,");
        let config = ScoutConfig::default().with_env_overrides();
        assert_eq!(config.seed_nodes.len(), DEFAULT_SEED_NODES.len());

        std::env::remove_var(SEED_NODES_ENV);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scout.toml");

        let config = ScoutConfig::default().with_max_depth(5);
        config.save(&path).unwrap();

        let loaded = ScoutConfig::load(&path).unwrap();
        assert_eq!(loaded.max_depth, 5);
        assert_eq!(loaded.seed_nodes, config.seed_nodes);
    }
}
