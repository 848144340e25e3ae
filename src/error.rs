//! Run-level error taxonomy
//!
//! Three kinds, all fatal, none retried:
//! - infrastructure: the cluster itself misbehaved (election, barrier, probe
//!   connectivity); retrying would hide propagation-timing defects
//! - setup: a mid-scenario precondition failed, so the scenario's own
//!   assumptions are violated
//! - mismatch: the final expected-vs-observed comparison disagreed; this is
//!   the signal the whole run exists to produce

use thiserror::Error;

use crate::cluster::error::ClusterError;
use crate::report::MismatchError;

/// Scenario driver phase, reported with setup failures for context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Dropping the namespace and awaiting the drop's propagation
    NamespaceReset,
    /// Applying the case's schema operations on the primary
    PrimaryMutated,
    /// Waiting on the replication barrier
    ReplicationSettled,
    /// Probing every node's catalog
    Probed,
    /// Comparing expected against observed
    Verified,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::NamespaceReset => "namespace-reset",
            Phase::PrimaryMutated => "primary-mutated",
            Phase::ReplicationSettled => "replication-settled",
            Phase::Probed => "probed",
            Phase::Verified => "verified",
        };
        write!(f, "{}", name)
    }
}

/// Top-level verification run error
#[derive(Error, Debug)]
pub enum RunError {
    /// Cluster-level failure: bootstrap, barrier, or probe connectivity
    #[error("infrastructure failure: {0}")]
    Infrastructure(#[from] ClusterError),

    /// A scenario precondition failed before the final assertion
    #[error("setup invariant violated in case '{case}' during {phase}: {reason}")]
    Setup {
        case: String,
        phase: Phase,
        reason: String,
    },

    /// The per-node expected-vs-observed comparison disagreed
    #[error(transparent)]
    Mismatch(#[from] MismatchError),
}

/// Result type for verification runs
pub type RunResult<T> = Result<T, RunError>;
