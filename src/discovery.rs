//! Network discoverer
//!
//! Breadth-first walk over the pod gossip graph, starting from the seed
//! set. Each frontier round asks every address for its known pods in
//! fixed-size concurrency batches. The visited set is keyed by address (do
//! not re-query a socket); the discovered set is keyed by identity (one
//! record per pod no matter how many addresses reach it).
//!
//! An address that fails or times out is simply dropped from traversal;
//! zero reachable seeds is the caller's signal to fall back to a non-live
//! source, not an error here.

use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::transport::{RpcTransport, TransportError};
use crate::types::{GetPodsResult, PeerAddress, PeerAnnouncement, PeerIdentity};

/// One discovered pod with the depth of the query that introduced it.
#[derive(Debug, Clone)]
pub struct DiscoveredPeer {
    pub announcement: PeerAnnouncement,

    /// Depth at which the *introducing* address was queried, not the pod's
    /// own position in the graph
    pub depth: u32,
}

/// Everything one traversal learned.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    /// Deduplicated pod set, keyed by identity
    pub peers: HashMap<PeerIdentity, DiscoveredPeer>,

    /// How many distinct responders announced each identity; feeds the
    /// visibility sub-score
    pub mentions: HashMap<PeerIdentity, usize>,

    /// Addresses that answered `get_pods` during this pass
    pub responders: usize,

    /// Seeds (depth-0 addresses) that answered; zero means no live data
    pub reachable_seeds: usize,
}

/// Breadth-first gossip traversal with bounded per-round concurrency.
pub struct Discoverer {
    transport: Arc<dyn RpcTransport>,
    batch_size: usize,
    call_timeout: Duration,
    deadline: Duration,
}

impl Discoverer {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        batch_size: usize,
        call_timeout: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            transport,
            batch_size: batch_size.max(1),
            call_timeout,
            deadline,
        }
    }

    /// Walk the graph from `seeds` down to `max_depth`.
    ///
    /// With `max_depth = 0` only the seeds themselves are queried; pods
    /// they announce are recorded but never asked for their own peers.
    pub async fn discover(&self, seeds: &[PeerAddress], max_depth: u32) -> DiscoveryOutcome {
        let started = tokio::time::Instant::now();
        let mut outcome = DiscoveryOutcome::default();

        let mut visited: HashSet<PeerAddress> = HashSet::new();
        let mut frontier: Vec<PeerAddress> = Vec::new();

        for seed in seeds {
            if visited.insert(seed.clone()) {
                frontier.push(seed.clone());
            }
        }

        let mut depth = 0u32;

        while !frontier.is_empty() {
            if started.elapsed() >= self.deadline {
                warn!(
                    "⏱️  discovery deadline reached at depth {}, keeping {} pods found so far",
                    depth,
                    outcome.peers.len()
                );
                break;
            }

            debug!("frontier round: depth {}, {} addresses", depth, frontier.len());
            let mut next_frontier: Vec<PeerAddress> = Vec::new();

            for chunk in frontier.chunks(self.batch_size) {
                let calls = chunk
                    .iter()
                    .map(|addr| async move { (addr, self.fetch_known_pods(addr).await) });

                for (addr, result) in join_all(calls).await {
                    let pods = match result {
                        Ok(pods) => pods,
                        Err(e) => {
                            debug!("pod {} excluded from traversal: {}", addr, e);
                            continue;
                        }
                    };

                    outcome.responders += 1;
                    if depth == 0 {
                        outcome.reachable_seeds += 1;
                    }

                    // Count each identity once per responder even if the
                    // response repeats it
                    let mut seen_in_response: HashSet<PeerIdentity> = HashSet::new();

                    for announcement in pods {
                        let identity = announcement.identity.clone();

                        if seen_in_response.insert(identity.clone()) {
                            *outcome.mentions.entry(identity.clone()).or_insert(0) += 1;
                        }

                        let newly_seen = !outcome.peers.contains_key(&identity);

                        if newly_seen {
                            outcome.peers.insert(
                                identity.clone(),
                                DiscoveredPeer {
                                    announcement: announcement.clone(),
                                    depth,
                                },
                            );

                            // Enqueue only fresh identities; the shallowest
                            // record keeps its depth
                            if depth + 1 <= max_depth
                                && !visited.contains(&announcement.address)
                            {
                                visited.insert(announcement.address.clone());
                                next_frontier.push(announcement.address.clone());
                            }
                        } else if let Some(existing) = outcome.peers.get_mut(&identity) {
                            // A strictly fresher observation updates the
                            // address fields but never the depth
                            if announcement.last_seen > existing.announcement.last_seen {
                                existing.announcement = announcement;
                            }
                        }
                    }
                }
            }

            frontier = next_frontier;
            depth += 1;
        }

        info!(
            "🔎 discovery finished: {} pods via {} responders ({}/{} seeds reachable)",
            outcome.peers.len(),
            outcome.responders,
            outcome.reachable_seeds,
            seeds.len()
        );

        outcome
    }

    /// Ask one address for its known pods.
    async fn fetch_known_pods(
        &self,
        address: &PeerAddress,
    ) -> Result<Vec<PeerAnnouncement>, TransportError> {
        let result = self
            .transport
            .call(address, "get_pods", serde_json::json!([]), self.call_timeout)
            .await?;

        let parsed: GetPodsResult = serde_json::from_value(result).map_err(|e| {
            TransportError::Unreachable(format!("malformed get_pods result: {}", e))
        })?;

        Ok(parsed
            .pods
            .into_iter()
            .map(|entry| entry.into_announcement())
            .collect())
    }
}
