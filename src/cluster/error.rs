//! Cluster and node error types

use std::time::Duration;

use thiserror::Error;

use crate::cluster::types::NodeId;

/// Errors from a single node's administrative or catalog interface
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    /// Node cannot be reached; distinct from "no matching catalog entry"
    #[error("node {node} unavailable: {reason}")]
    Unavailable { node: NodeId, reason: String },

    /// Write-path command issued against a node that is not the primary
    #[error("node {node} is not the primary")]
    NotPrimary { node: NodeId },

    /// Command rejected before execution (empty namespace, non-positive size)
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Command failed during execution
    #[error("command failed: {0}")]
    Command(String),
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;

/// Infrastructure-level cluster failures
///
/// All variants are fatal to a verification run and are never retried;
/// retrying would hide real propagation-timing defects.
#[derive(Error, Debug, Clone)]
pub enum ClusterError {
    /// No primary elected within the bootstrap timeout
    #[error("no primary elected within {0:?}")]
    ElectionTimeout(Duration),

    /// A secondary failed to catch up within the barrier timeout
    #[error("replication barrier timed out after {timeout:?} (node {node} applied {applied}/{head})")]
    ReplicationTimeout {
        timeout: Duration,
        node: NodeId,
        applied: u64,
        head: u64,
    },

    /// Cluster cannot be formed as requested
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Catalog probe failed for infrastructure reasons
    #[error("catalog probe on node {node} failed: {source}")]
    Probe { node: NodeId, source: NodeError },

    /// Administrative command failed at the node level
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Result type for cluster operations
pub type ClusterResult<T> = Result<T, ClusterError>;
