//! replvet binary
//!
//! Bootstraps an in-process replica set, runs the built-in scenario cases,
//! and exits with a code reflecting the outcome.
//!
//! Exit codes:
//!   0 - all invariants hold
//!   1 - invariant mismatch (the signal the run exists to produce)
//!   2 - scenario setup precondition failed
//!   3 - infrastructure failure (bootstrap, barrier, probe connectivity)

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use replvet::error::RunError;
use replvet::scenario::{builtin_cases, run_scenarios};
use replvet::sim::{SimConfig, SimReplicaSet};

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify capped-collection primary-key index invariants across a replica set")]
struct Cli {
    /// Total node count (one primary plus secondaries)
    #[arg(long, default_value_t = 3, env = "REPLVET_NODES")]
    nodes: usize,

    /// Replication barrier timeout in seconds
    #[arg(long, default_value_t = 10, env = "REPLVET_REPLICATION_TIMEOUT_SECS")]
    replication_timeout_secs: u64,

    /// Primary election timeout in seconds
    #[arg(long, default_value_t = 10, env = "REPLVET_ELECTION_TIMEOUT_SECS")]
    election_timeout_secs: u64,

    /// Artificial secondary apply lag in milliseconds
    #[arg(long, default_value_t = 1, env = "REPLVET_APPLY_LAG_MS")]
    apply_lag_ms: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = SimConfig {
        nodes: cli.nodes,
        election_timeout: Duration::from_secs(cli.election_timeout_secs),
        replication_timeout: Duration::from_secs(cli.replication_timeout_secs),
        apply_lag: Duration::from_millis(cli.apply_lag_ms),
    };

    tracing::info!(nodes = config.nodes, "starting verification run");

    let set = match SimReplicaSet::bootstrap(config).await {
        Ok(set) => set,
        Err(e) => {
            eprintln!("ERROR: failed to bootstrap replica set: {}", e);
            std::process::exit(3);
        }
    };

    match run_scenarios(&set, &builtin_cases()).await {
        Ok(()) => {
            tracing::info!("all scenario cases passed");
        }
        Err(RunError::Mismatch(e)) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Err(e @ RunError::Setup { .. }) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(2);
        }
        Err(e @ RunError::Infrastructure(_)) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(3);
        }
    }
}
