//! Cluster handle and node interfaces
//!
//! The verification workflow consumes a running replica set only through
//! these traits: an administrative/query interface per node and a handle for
//! the set as a whole. The real cluster (process lifecycle, election, log
//! shipping) lives behind them.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::cluster::error::{ClusterResult, NodeResult};
use crate::cluster::types::{
    CollectionOptions, IndexDescriptor, IndexFilter, Namespace, NodeId, NodeRole,
};

/// Administrative and catalog interface to one node of the store
#[async_trait]
pub trait DocumentNode: Send + Sync {
    /// Node identifier
    fn id(&self) -> NodeId;

    /// Role the node currently plays
    fn role(&self) -> NodeRole;

    /// Create a collection
    ///
    /// Normal collections implicitly gain a primary-key index; capped
    /// collections do not. `size` must be positive when `capped` is set.
    async fn create_collection(
        &self,
        namespace: &Namespace,
        options: &CollectionOptions,
    ) -> NodeResult<()>;

    /// Convert an existing collection to capped form in place
    ///
    /// Namespace identity is preserved; `size` must be positive.
    async fn convert_to_capped(&self, namespace: &Namespace, size: u64) -> NodeResult<()>;

    /// Drop a collection and all of its indexes
    ///
    /// Dropping a namespace that does not exist is not an error.
    async fn drop_collection(&self, namespace: &Namespace) -> NodeResult<()>;

    /// Insert a document
    async fn insert(&self, namespace: &Namespace, document: Value) -> NodeResult<()>;

    /// Read-only catalog query: all index descriptors matching the filter
    ///
    /// Never mutates state. Zero matches yields an empty vector; transient
    /// unavailability yields an error, so the caller can tell "absent" from
    /// "unknown".
    async fn query_indexes(&self, filter: &IndexFilter) -> NodeResult<Vec<IndexDescriptor>>;
}

/// Handle to a running replica set: one primary plus N secondaries
#[async_trait]
pub trait ReplicaSet: Send + Sync {
    /// The node currently accepting writes
    fn primary(&self) -> Arc<dyn DocumentNode>;

    /// Secondary nodes, in an order stable across calls within one run
    fn secondaries(&self) -> Vec<Arc<dyn DocumentNode>>;

    /// Block until every secondary has applied all operations issued to the
    /// primary before this call
    ///
    /// This is the only ordering guarantee the verification workflow relies
    /// on; probing a secondary without it races the propagation.
    async fn await_replication(&self) -> ClusterResult<()>;

    /// Terminate all nodes
    ///
    /// Idempotent; the run invokes it on every exit path.
    async fn shutdown(&self) -> ClusterResult<()>;
}
