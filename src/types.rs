//! Core types for pod discovery and reliability scoring
//!
//! These types model what the engine learns about the network: what pods
//! announce about each other, what a direct probe measures, and the scored
//! records handed to consumers. Identity is always the pod's public key,
//! never its address.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, globally unique pod identifier (public key).
///
/// The dedup key for every set operation in the engine. Two announcements
/// with the same identity describe the same pod even when their addresses
/// differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIdentity(pub String);

impl PeerIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerIdentity {
    fn from(s: &str) -> Self {
        PeerIdentity(s.to_string())
    }
}

/// Reachable socket for a pod.
///
/// A pod may be reachable at a stale address; addresses are how we *reach*
/// pods, never how we *identify* them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`, falling back to `default_port` when no port is given.
    pub fn parse(s: &str, default_port: u16) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().ok()?;
                if host.is_empty() {
                    return None;
                }
                Some(Self::new(host, port))
            }
            None => Some(Self::new(s, default_port)),
        }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// What one pod reports knowing about another during traversal.
///
/// Produced from a `get_pods` response; consumed by the discoverer to grow
/// the frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerAnnouncement {
    /// Announced pod's identity (public key)
    pub identity: PeerIdentity,

    /// Address the announcing pod last used to reach it
    pub address: PeerAddress,

    /// Unix timestamp of the announcing pod's last contact
    pub last_seen: u64,

    /// Software version the announcing pod recorded
    pub version: Option<String>,
}

/// Best-effort resolved location for a pod's host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Measurement of one pod from a direct probe.
///
/// Created fresh per probe attempt and never mutated; the next probe
/// supersedes it wholesale. `reachable = false` carries no latency and
/// forces downstream sub-scores to their floors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Total storage capacity reported by the pod (bytes)
    pub capacity_bytes: u64,

    /// Storage in use (bytes)
    pub used_bytes: u64,

    /// How many pods this pod claims to know
    pub peer_count: u32,

    /// Reported process uptime (seconds)
    pub uptime_seconds: u64,

    /// Whether the stats call succeeded within the timeout
    pub reachable: bool,

    /// Wall-clock latency of the successful stats call.
    /// Absent when unreachable; never 0 or the timeout value.
    pub latency_ms: Option<u64>,

    /// Best-effort geolocation of the pod's host
    pub location: Option<Location>,

    /// Version string reported by the pod itself
    pub version: Option<String>,
}

impl ProbeResult {
    /// Result for a pod that did not answer within the timeout.
    pub fn unreachable() -> Self {
        Self {
            capacity_bytes: 0,
            used_bytes: 0,
            peer_count: 0,
            uptime_seconds: 0,
            reachable: false,
            latency_ms: None,
            location: None,
            version: None,
        }
    }
}

/// Scored, display-ready record for one pod.
///
/// The full record set for a pass is replaced atomically on refresh, never
/// patched field by field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityRecord {
    pub identity: PeerIdentity,
    pub address: PeerAddress,
    pub last_seen: u64,

    pub probe: ProbeResult,

    /// 0 or 100: was the pod reachable on its latest probe
    pub availability: u8,

    /// 0..100: share of responding pods that announced this identity
    pub visibility: u8,

    /// 0 or 100: does the reported version meet the configured latest
    pub compliance: u8,

    /// Weighted composite reliability index, 0..100
    pub score: u8,
}

/// Aggregate summary over one pass's record set.
///
/// Simple reductions only; every average guards the empty set rather than
/// producing NaN-equivalent values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_pods: usize,
    pub reachable_pods: usize,
    pub compliant_pods: usize,
    pub total_capacity_bytes: u64,
    pub total_used_bytes: u64,
    pub average_score: f64,
    pub average_latency_ms: f64,
    pub average_uptime_seconds: f64,
}

impl NetworkStats {
    /// Reduce a record set into summary stats.
    pub fn from_records(records: &[ReliabilityRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let reachable: Vec<_> = records.iter().filter(|r| r.probe.reachable).collect();

        let average_score =
            records.iter().map(|r| r.score as f64).sum::<f64>() / records.len() as f64;

        let latencies: Vec<u64> = reachable.iter().filter_map(|r| r.probe.latency_ms).collect();
        let average_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        };

        let average_uptime_seconds = if reachable.is_empty() {
            0.0
        } else {
            reachable
                .iter()
                .map(|r| r.probe.uptime_seconds as f64)
                .sum::<f64>()
                / reachable.len() as f64
        };

        Self {
            total_pods: records.len(),
            reachable_pods: reachable.len(),
            compliant_pods: records.iter().filter(|r| r.compliance == 100).count(),
            total_capacity_bytes: records.iter().map(|r| r.probe.capacity_bytes).sum(),
            total_used_bytes: records.iter().map(|r| r.probe.used_bytes).sum(),
            average_score,
            average_latency_ms,
            average_uptime_seconds,
        }
    }
}

// =============================================================================
// WIRE PAYLOADS
// =============================================================================

/// One entry in a `get_pods` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodEntry {
    pub public_key: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub last_seen: u64,
    #[serde(default)]
    pub version: Option<String>,
}

impl PodEntry {
    /// Convert a wire entry into an announcement.
    pub fn into_announcement(self) -> PeerAnnouncement {
        PeerAnnouncement {
            identity: PeerIdentity(self.public_key),
            address: PeerAddress::new(self.host, self.port),
            last_seen: self.last_seen,
            version: self.version,
        }
    }
}

/// `get_pods` result: known-peers list plus total count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPodsResult {
    pub pods: Vec<PodEntry>,
    #[serde(default)]
    pub total: u64,
}

/// `get_stats` result: capacity and uptime record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStatsResult {
    #[serde(default)]
    pub capacity: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub pod_count: u32,
    #[serde(default)]
    pub uptime: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, reachable: bool, score: u8, capacity: u64) -> ReliabilityRecord {
        ReliabilityRecord {
            identity: id.into(),
            address: PeerAddress::new("10.0.0.1", 8417),
            last_seen: 1_700_000_000,
            probe: ProbeResult {
                capacity_bytes: capacity,
                used_bytes: capacity / 2,
                peer_count: 4,
                uptime_seconds: 3600,
                reachable,
                latency_ms: if reachable { Some(42) } else { None },
                location: None,
                version: Some("0.5.0".to_string()),
            },
            availability: if reachable { 100 } else { 0 },
            visibility: 100,
            compliance: 100,
            score,
        }
    }

    #[test]
    fn test_address_parse() {
        let addr = PeerAddress::parse("seed1.podnet.io:9000", 8417).unwrap();
        assert_eq!(addr.host, "seed1.podnet.io");
        assert_eq!(addr.port, 9000);

        let addr = PeerAddress::parse("10.0.0.5", 8417).unwrap();
        assert_eq!(addr.port, 8417);

        assert!(PeerAddress::parse("", 8417).is_none());
        assert!(PeerAddress::parse("host:notaport", 8417).is_none());
    }

    #[test]
    fn test_unreachable_probe_has_no_latency() {
        let probe = ProbeResult::unreachable();
        assert!(!probe.reachable);
        assert!(probe.latency_ms.is_none());
    }

    #[test]
    fn test_stats_empty_set() {
        let stats = NetworkStats::from_records(&[]);
        assert_eq!(stats.total_pods, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.average_latency_ms, 0.0);
    }

    #[test]
    fn test_stats_reduction() {
        let records = vec![
            record("a", true, 100, 1000),
            record("b", true, 70, 3000),
            record("c", false, 30, 0),
        ];

        let stats = NetworkStats::from_records(&records);
        assert_eq!(stats.total_pods, 3);
        assert_eq!(stats.reachable_pods, 2);
        assert_eq!(stats.total_capacity_bytes, 4000);
        assert!((stats.average_score - (200.0 / 3.0)).abs() < 0.01);
        // Latency averages only over reachable pods
        assert!((stats.average_latency_ms - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pod_entry_conversion() {
        let entry = PodEntry {
            public_key: "pk-abc".to_string(),
            host: "10.1.1.1".to_string(),
            port: 8417,
            last_seen: 1_700_000_123,
            version: Some("0.5.0-arcadia".to_string()),
        };

        let ann = entry.into_announcement();
        assert_eq!(ann.identity.as_str(), "pk-abc");
        assert_eq!(ann.address.to_string(), "10.1.1.1:8417");
    }
}
