//! Podnet Scout CLI
//!
//! Runs one discovery + scoring pass against the live network and prints
//! the result, either as a human-readable table or as JSON for piping into
//! the dashboard layer.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use podnet_scout::config::ScoutConfig;
use podnet_scout::engine::{Liveness, ScoutEngine};
use podnet_scout::geo::{GeolocationResolver, HttpGeoResolver, NullGeoResolver};
use podnet_scout::transport::HttpTransport;

/// Podnet Scout - pod discovery and reliability scoring
#[derive(Parser, Debug)]
#[command(name = "podnet-scout")]
#[command(version = "0.1.0")]
#[command(about = "Discovery and reliability-scoring engine for the podnet network", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "scout.toml")]
    config: PathBuf,

    /// Seed addresses (host:port), overriding config and environment
    #[arg(long, value_delimiter = ',')]
    seeds: Vec<String>,

    /// Maximum gossip traversal depth
    #[arg(long)]
    max_depth: Option<u32>,

    /// Per-call timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// In-flight call cap per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Print the snapshot as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Skip geolocation lookups even if the config enables them
    #[arg(long)]
    no_geo: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .init();

    info!("🔭 Podnet Scout v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration: defaults -> file -> env -> CLI
    let config = if args.config.exists() {
        ScoutConfig::load(&args.config)?
    } else {
        warn!("config file not found, using defaults");
        ScoutConfig::default()
    };

    let mut config = config.with_env_overrides().with_seed_nodes(args.seeds);

    if let Some(depth) = args.max_depth {
        config = config.with_max_depth(depth);
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_call_timeout_ms(ms);
    }
    if let Some(size) = args.batch_size {
        config = config.with_batch_size(size);
    }

    config.validate()?;

    info!("⚙️  Configuration:");
    info!("   Seeds: {}", config.seed_nodes.join(", "));
    info!("   Max depth: {}", config.max_depth);
    info!("   Batch size: {}", config.batch_size);
    info!("   Call timeout: {} ms", config.call_timeout_ms);

    let transport = Arc::new(HttpTransport::new()?);

    let geo: Arc<dyn GeolocationResolver> = if config.enable_geo && !args.no_geo {
        Arc::new(HttpGeoResolver::new(config.geo_endpoint.clone()))
    } else {
        Arc::new(NullGeoResolver)
    };

    let engine = ScoutEngine::new(config, transport, geo);
    let snapshot = engine.network_snapshot().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
        return Ok(());
    }

    match snapshot.liveness {
        Liveness::SeedsUnreachable => {
            warn!("💔 No seed answered; the live network is unavailable");
        }
        Liveness::Live if snapshot.records.is_empty() => {
            info!("Network is live but reported no pods");
        }
        Liveness::Live => {
            println!(
                "{:<20} {:<22} {:>5} {:>5} {:>5} {:>5} {:>9}",
                "IDENTITY", "ADDRESS", "SCORE", "AVAIL", "VIS", "COMPL", "LATENCY"
            );

            for record in &snapshot.records {
                let latency = record
                    .probe
                    .latency_ms
                    .map(|ms| format!("{} ms", ms))
                    .unwrap_or_else(|| "-".to_string());

                println!(
                    "{:<20} {:<22} {:>5} {:>5} {:>5} {:>5} {:>9}",
                    truncate(record.identity.as_str(), 20),
                    truncate(&record.address.to_string(), 22),
                    record.score,
                    record.availability,
                    record.visibility,
                    record.compliance,
                    latency,
                );
            }

            let stats = &snapshot.stats;
            println!();
            println!(
                "{} pods ({} reachable, {} compliant), avg score {:.1}, avg latency {:.0} ms",
                stats.total_pods,
                stats.reachable_pods,
                stats.compliant_pods,
                stats.average_score,
                stats.average_latency_ms,
            );
            println!(
                "capacity {} used {} ({:.1}% full)",
                format_bytes(stats.total_capacity_bytes),
                format_bytes(stats.total_used_bytes),
                if stats.total_capacity_bytes > 0 {
                    stats.total_used_bytes as f64 / stats.total_capacity_bytes as f64 * 100.0
                } else {
                    0.0
                },
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, UNITS[unit])
}
