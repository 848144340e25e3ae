//! Assertion reporter
//!
//! Compares the expected and observed index-presence vectors across the
//! whole node set and renders a diagnostic trace of each node's catalog.
//! All mismatches for a case are collected into one error, so a single run
//! surfaces every divergence rather than just the first.

use std::fmt;

use crate::cluster::types::{IndexDescriptor, Namespace, NodeId, NodeRole};

/// Expected and observed index presence for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeObservation {
    /// Node identity
    pub node: NodeId,
    /// Role at probe time
    pub role: NodeRole,
    /// What the scenario case predicts
    pub expected: bool,
    /// What the catalog probe reported
    pub observed: bool,
}

impl NodeObservation {
    /// Whether expectation and observation agree
    pub fn matches(&self) -> bool {
        self.expected == self.observed
    }
}

/// One node's full index catalog for a database, captured for diagnostics
#[derive(Debug, Clone)]
pub struct CatalogDump {
    /// Node identity
    pub node: NodeId,
    /// Role at dump time
    pub role: NodeRole,
    /// Every index descriptor the node reported
    pub indexes: Vec<IndexDescriptor>,
}

impl fmt::Display for CatalogDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "node {} ({}) indexes:", self.node, self.role)?;
        if self.indexes.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for idx in &self.indexes {
            writeln!(f, "  {}", idx)?;
        }
        Ok(())
    }
}

/// Invariant mismatch: the designed output of the verification run
///
/// Carries every disagreeing node for the case, plus full catalog dumps.
#[derive(Debug, Clone)]
pub struct MismatchError {
    /// Scenario case identifier
    pub case: String,
    /// Namespace under test
    pub namespace: Namespace,
    /// All observations, matching and mismatching, in node order
    pub observations: Vec<NodeObservation>,
    /// Per-node catalog dumps
    pub dumps: Vec<CatalogDump>,
}

impl MismatchError {
    /// Only the disagreeing observations
    pub fn mismatches(&self) -> impl Iterator<Item = &NodeObservation> {
        self.observations.iter().filter(|o| !o.matches())
    }
}

impl fmt::Display for MismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "invariant mismatch in case '{}' on {}:",
            self.case, self.namespace
        )?;
        for obs in &self.observations {
            let marker = if obs.matches() { "ok  " } else { "FAIL" };
            writeln!(
                f,
                "  [{}] node {} ({}): expected index present={}, observed={}",
                marker, obs.node, obs.role, obs.expected, obs.observed
            )?;
        }
        for dump in &self.dumps {
            write!(f, "{}", dump)?;
        }
        Ok(())
    }
}

impl std::error::Error for MismatchError {}

/// Compare expected vs observed across all nodes
///
/// Returns `Ok(())` when every node agrees; otherwise one `MismatchError`
/// carrying all divergences and the supplied catalog dumps.
pub fn verify(
    case: &str,
    namespace: &Namespace,
    observations: Vec<NodeObservation>,
    dumps: Vec<CatalogDump>,
) -> Result<(), MismatchError> {
    if observations.iter().all(NodeObservation::matches) {
        tracing::info!(case, %namespace, nodes = observations.len(), "invariant holds on every node");
        return Ok(());
    }
    Err(MismatchError {
        case: case.to_string(),
        namespace: namespace.clone(),
        observations,
        dumps,
    })
}
