//! Peer prober
//!
//! Hydrates one pod: asks it for its known-peers list, its capacity/uptime
//! stats, and its version, all through the transport client. The three
//! calls are independent reads and run concurrently against the same
//! address.
//!
//! Transport failures stop here: they become `reachable = false` results,
//! never errors. Geolocation is best-effort and memoized per host for the
//! lifetime of the prober (one discovery pass).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::geo::GeolocationResolver;
use crate::transport::RpcTransport;
use crate::types::{GetPodsResult, GetStatsResult, Location, PeerAddress, ProbeResult};

/// Probes pods for liveness, capacity, and version.
///
/// Construct one per discovery pass; the geolocation memo is scoped to the
/// prober's lifetime.
pub struct Prober {
    transport: Arc<dyn RpcTransport>,
    geo: Arc<dyn GeolocationResolver>,
    call_timeout: Duration,

    /// Per-pass memo: at most one resolver call per distinct host
    geo_cache: Mutex<HashMap<String, Option<Location>>>,
}

impl Prober {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        geo: Arc<dyn GeolocationResolver>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            geo,
            call_timeout,
            geo_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Measure one pod.
    ///
    /// Liveness and latency come from the stats call alone: a pod that
    /// answers `get_version` but not `get_stats` is not reachable for
    /// scoring purposes. Latency is wall clock from call start to success
    /// and is absent on failure, never zero or the timeout value.
    pub async fn probe(&self, address: &PeerAddress) -> ProbeResult {
        let stats_call = async {
            let started = tokio::time::Instant::now();
            let result = self
                .transport
                .call(address, "get_stats", serde_json::json!([]), self.call_timeout)
                .await;
            (result, started.elapsed())
        };

        let pods_call = self.transport.call(
            address,
            "get_pods",
            serde_json::json!([]),
            self.call_timeout,
        );

        let version_call = self.transport.call(
            address,
            "get_version",
            serde_json::json!([]),
            self.call_timeout,
        );

        let ((stats_result, stats_elapsed), pods_result, version_result) =
            tokio::join!(stats_call, pods_call, version_call);

        let stats: GetStatsResult = match stats_result
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| {
                    crate::transport::TransportError::Unreachable(format!(
                        "malformed get_stats result: {}",
                        e
                    ))
                })
            }) {
            Ok(stats) => stats,
            Err(e) => {
                debug!("probe of {} failed: {}", address, e);
                return ProbeResult::unreachable();
            }
        };

        // get_pods here only refines the peer count; the stats record is
        // authoritative when both are present
        let peer_count = match pods_result
            .ok()
            .and_then(|v| serde_json::from_value::<GetPodsResult>(v).ok())
        {
            // The total is wire-supplied; saturate rather than wrap
            Some(pods) if pods.total > 0 => u32::try_from(pods.total).unwrap_or(u32::MAX),
            Some(pods) => pods.pods.len() as u32,
            None => stats.pod_count,
        };

        let version = version_result
            .ok()
            .and_then(|v| serde_json::from_value::<String>(v).ok());

        let location = self.resolve_location(&address.host).await;

        ProbeResult {
            capacity_bytes: stats.capacity,
            used_bytes: stats.used,
            peer_count,
            uptime_seconds: stats.uptime,
            reachable: true,
            latency_ms: Some(stats_elapsed.as_millis() as u64),
            location,
            version,
        }
    }

    /// Memoized best-effort geolocation. Failure is cached too, so one
    /// dead resolver endpoint costs a single lookup per host per pass.
    async fn resolve_location(&self, host: &str) -> Option<Location> {
        {
            let cache = self.geo_cache.lock().await;
            if let Some(cached) = cache.get(host) {
                return cached.clone();
            }
        }

        let resolved = self.geo.resolve(host).await;

        let mut cache = self.geo_cache.lock().await;
        cache.insert(host.to_string(), resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::NullGeoResolver;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One scriptable pod behind the transport seam.
    struct MockPod {
        stats_ok: bool,
        version: Option<&'static str>,
        pods_total: u64,
    }

    #[async_trait]
    impl RpcTransport for MockPod {
        async fn call(
            &self,
            _address: &PeerAddress,
            method: &str,
            _params: serde_json::Value,
            timeout: Duration,
        ) -> Result<serde_json::Value, TransportError> {
            match method {
                "get_stats" => {
                    if self.stats_ok {
                        Ok(serde_json::json!({
                            "capacity": 1_000_000u64,
                            "used": 250_000u64,
                            "pod_count": 7,
                            "uptime": 86_400u64,
                        }))
                    } else {
                        Err(TransportError::Timeout(timeout.as_millis() as u64))
                    }
                }
                "get_pods" => Ok(serde_json::json!({ "pods": [], "total": self.pods_total })),
                "get_version" => match self.version {
                    Some(v) => Ok(serde_json::json!(v)),
                    None => Err(TransportError::Unreachable("no version".to_string())),
                },
                other => panic!("unexpected method {}", other),
            }
        }
    }

    /// Resolver that counts invocations.
    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GeolocationResolver for CountingResolver {
        async fn resolve(&self, _host: &str) -> Option<Location> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(Location {
                country: Some("DE".to_string()),
                city: None,
                latitude: None,
                longitude: None,
            })
        }
    }

    fn addr() -> PeerAddress {
        PeerAddress::new("10.0.0.1", 8417)
    }

    #[tokio::test]
    async fn test_probe_reachable_pod() {
        let prober = Prober::new(
            Arc::new(MockPod {
                stats_ok: true,
                version: Some("0.5.0-arcadia"),
                pods_total: 12,
            }),
            Arc::new(NullGeoResolver),
            Duration::from_secs(5),
        );

        let result = prober.probe(&addr()).await;
        assert!(result.reachable);
        assert!(result.latency_ms.is_some());
        assert_eq!(result.capacity_bytes, 1_000_000);
        assert_eq!(result.used_bytes, 250_000);
        assert_eq!(result.uptime_seconds, 86_400);
        assert_eq!(result.peer_count, 12);
        assert_eq!(result.version.as_deref(), Some("0.5.0-arcadia"));
    }

    #[tokio::test]
    async fn test_failed_stats_means_unreachable() {
        let prober = Prober::new(
            Arc::new(MockPod {
                stats_ok: false,
                version: Some("0.5.0"),
                pods_total: 12,
            }),
            Arc::new(NullGeoResolver),
            Duration::from_secs(5),
        );

        let result = prober.probe(&addr()).await;
        assert!(!result.reachable);
        // Latency must be absent, not zero or the timeout value
        assert!(result.latency_ms.is_none());
        assert_eq!(result.capacity_bytes, 0);
    }

    #[tokio::test]
    async fn test_missing_version_is_tolerated() {
        let prober = Prober::new(
            Arc::new(MockPod {
                stats_ok: true,
                version: None,
                pods_total: 12,
            }),
            Arc::new(NullGeoResolver),
            Duration::from_secs(5),
        );

        let result = prober.probe(&addr()).await;
        assert!(result.reachable);
        assert!(result.version.is_none());
    }

    #[tokio::test]
    async fn test_geo_resolved_once_per_host() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });

        let prober = Prober::new(
            Arc::new(MockPod {
                stats_ok: true,
                version: Some("0.5.0"),
                pods_total: 12,
            }),
            resolver.clone(),
            Duration::from_secs(5),
        );

        prober.probe(&addr()).await;
        prober.probe(&addr()).await;
        prober.probe(&PeerAddress::new("10.0.0.2", 8417)).await;

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_oversized_pod_total_saturates() {
        // A hostile or buggy pod can report any u64 total; the count must
        // clamp at the type ceiling instead of wrapping to a small number
        let prober = Prober::new(
            Arc::new(MockPod {
                stats_ok: true,
                version: Some("0.5.0"),
                pods_total: u64::MAX,
            }),
            Arc::new(NullGeoResolver),
            Duration::from_secs(5),
        );

        let result = prober.probe(&addr()).await;
        assert!(result.reachable);
        assert_eq!(result.peer_count, u32::MAX);
    }

    #[tokio::test]
    async fn test_geo_failure_never_fails_probe() {
        let prober = Prober::new(
            Arc::new(MockPod {
                stats_ok: true,
                version: Some("0.5.0"),
                pods_total: 12,
            }),
            Arc::new(NullGeoResolver),
            Duration::from_secs(5),
        );

        let result = prober.probe(&addr()).await;
        assert!(result.reachable);
        assert!(result.location.is_none());
    }
}
