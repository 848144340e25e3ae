//! Cluster handle contract
//!
//! Defines the data model (namespaces, index descriptors, roles) and the
//! traits through which the verification workflow reaches a replica set:
//! - `DocumentNode`: per-node administrative commands and catalog queries
//! - `ReplicaSet`: primary/secondary accessors, replication barrier, shutdown
//!
//! The workflow never touches replication or election mechanics directly;
//! those live behind the traits (see the `sim` module for the in-process
//! implementation).

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ClusterError, ClusterResult, NodeError, NodeResult};
pub use traits::{DocumentNode, ReplicaSet};
pub use types::{
    CollectionOptions, IndexDescriptor, IndexFilter, KeyPattern, Namespace, NodeId, NodeRole,
};
