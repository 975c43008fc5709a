//! Scout engine
//!
//! Runs the full pass: discover the pod graph, hydrate every discovered pod
//! in bounded batches through the prober, score each one, and publish the
//! sorted snapshot through the aggregate cache. Repeated requests within
//! the TTL window never re-walk the network.
//!
//! A pass never fails past this boundary. When no seed answers, the
//! snapshot is empty and its liveness flag says so, letting callers fall
//! back to a non-live source instead of failing the request.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::AggregateCache;
use crate::config::{ScoutConfig, PEER_LIST_KEY};
use crate::discovery::{DiscoveredPeer, Discoverer};
use crate::geo::GeolocationResolver;
use crate::prober::Prober;
use crate::scoring;
use crate::transport::RpcTransport;
use crate::types::{NetworkStats, ReliabilityRecord};

/// Whether a pass saw a live network at all.
///
/// "Seeds answered but reported zero pods" and "no seed answered" are
/// different situations; only the latter warrants a fallback data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Liveness {
    /// At least one seed answered; records reflect the live network
    Live,

    /// No seed answered within the timeout; there is no live data
    SeedsUnreachable,
}

/// One finished pass: the scored record set plus its aggregate summary.
///
/// Replaced wholesale on refresh; never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub records: Vec<ReliabilityRecord>,
    pub stats: NetworkStats,
    pub liveness: Liveness,
    pub generated_at: DateTime<Utc>,
}

impl NetworkSnapshot {
    fn empty(liveness: Liveness) -> Self {
        Self {
            records: Vec::new(),
            stats: NetworkStats::default(),
            liveness,
            generated_at: Utc::now(),
        }
    }
}

/// Discovery + probing + scoring behind a TTL cache.
pub struct ScoutEngine {
    config: ScoutConfig,
    transport: Arc<dyn RpcTransport>,
    geo: Arc<dyn GeolocationResolver>,
    cache: AggregateCache<NetworkSnapshot>,
}

impl ScoutEngine {
    pub fn new(
        config: ScoutConfig,
        transport: Arc<dyn RpcTransport>,
        geo: Arc<dyn GeolocationResolver>,
    ) -> Self {
        Self {
            config,
            transport,
            geo,
            cache: AggregateCache::new(),
        }
    }

    /// Current snapshot, from cache when fresh, otherwise from a new pass.
    pub async fn network_snapshot(&self) -> Arc<NetworkSnapshot> {
        if let Some(snapshot) = self.cache.get(PEER_LIST_KEY).await {
            return snapshot;
        }

        let snapshot = self.run_pass().await;
        self.cache
            .set(PEER_LIST_KEY, snapshot.clone(), self.config.cache_ttl())
            .await;

        Arc::new(snapshot)
    }

    /// Drop the cached snapshot and run a fresh pass now.
    pub async fn refresh(&self) -> Arc<NetworkSnapshot> {
        self.cache.invalidate(PEER_LIST_KEY).await;
        self.network_snapshot().await
    }

    /// One end-to-end pass over the network.
    async fn run_pass(&self) -> NetworkSnapshot {
        let seeds = self.config.seed_addresses();
        if seeds.is_empty() {
            warn!("no usable seed addresses configured");
            return NetworkSnapshot::empty(Liveness::SeedsUnreachable);
        }

        let discoverer = Discoverer::new(
            self.transport.clone(),
            self.config.batch_size,
            self.config.call_timeout(),
            self.config.pass_deadline(),
        );

        let outcome = discoverer.discover(&seeds, self.config.max_depth).await;

        if outcome.reachable_seeds == 0 {
            warn!("no seed answered; serving empty snapshot for fallback");
            return NetworkSnapshot::empty(Liveness::SeedsUnreachable);
        }

        let prober = Prober::new(
            self.transport.clone(),
            self.geo.clone(),
            self.config.call_timeout(),
        );

        let peers: Vec<DiscoveredPeer> = outcome.peers.values().cloned().collect();
        let mut records = Vec::with_capacity(peers.len());
        let prober = &prober;

        for chunk in peers.chunks(self.config.batch_size.max(1)) {
            let probes = chunk
                .iter()
                .map(|peer| async move { (peer, prober.probe(&peer.announcement.address).await) });

            for (peer, probe) in join_all(probes).await {
                let announcement = &peer.announcement;

                let availability = scoring::availability_score(probe.reachable);

                let mentions = outcome
                    .mentions
                    .get(&announcement.identity)
                    .copied()
                    .unwrap_or(0);
                let visibility = scoring::visibility_score(
                    mentions,
                    outcome.responders,
                    self.config.default_visibility,
                );

                // Compliance comes only from the version the pod reported
                // itself; an unreachable pod stays at the floor no matter
                // what gossip claims it runs
                let compliance = scoring::compliance_score(
                    probe.version.as_deref(),
                    &self.config.latest_version,
                );

                let score = scoring::composite_score(availability, visibility, compliance);

                records.push(ReliabilityRecord {
                    identity: announcement.identity.clone(),
                    address: announcement.address.clone(),
                    last_seen: announcement.last_seen,
                    probe,
                    availability,
                    visibility,
                    compliance,
                    score,
                });
            }
        }

        // Descending by index; identity lexical order keeps pagination
        // deterministic on ties
        records.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.identity.cmp(&b.identity))
        });

        let stats = NetworkStats::from_records(&records);

        info!(
            "📊 pass complete: {} pods, {} reachable, avg score {:.1}",
            stats.total_pods, stats.reachable_pods, stats.average_score
        );

        NetworkSnapshot {
            records,
            stats,
            liveness: Liveness::Live,
            generated_at: Utc::now(),
        }
    }
}
