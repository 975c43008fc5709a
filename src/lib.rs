//! Podnet Scout
//!
//! Discovery and reliability-scoring engine for the podnet storage
//! network. Walks the gossip graph from a seed set, probes every reachable
//! pod for liveness and capacity within a bounded time budget, reduces the
//! measurements to one 0-100 reliability index per pod, and memoizes the
//! whole pass behind a short-lived cache.
//!
//! The consuming layer (dashboards, APIs) reads [`engine::NetworkSnapshot`]
//! values; everything network-facing hides behind the
//! [`transport::RpcTransport`] and [`geo::GeolocationResolver`] seams.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod geo;
pub mod prober;
pub mod scoring;
pub mod transport;
pub mod types;

pub use cache::AggregateCache;
pub use config::ScoutConfig;
pub use discovery::{DiscoveryOutcome, Discoverer};
pub use engine::{Liveness, NetworkSnapshot, ScoutEngine};
pub use geo::{GeolocationResolver, HttpGeoResolver, NullGeoResolver};
pub use prober::Prober;
pub use transport::{HttpTransport, RpcTransport, TransportError};
pub use types::{
    NetworkStats, PeerAddress, PeerAnnouncement, PeerIdentity, ProbeResult, ReliabilityRecord,
};
