//! In-process replica set
//!
//! One primary plus N secondaries backed by in-memory stores. The primary
//! appends every operation to a shared oplog and announces the head sequence
//! over a watch channel; each secondary runs a tokio task that replays the
//! log asynchronously with a small artificial lag, publishing its applied
//! sequence. `await_replication` is the barrier the verification workflow
//! relies on: it waits, bounded by a timeout, until every secondary's applied
//! sequence reaches the head.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::cluster::error::{ClusterError, ClusterResult, NodeError, NodeResult};
use crate::cluster::traits::{DocumentNode, ReplicaSet};
use crate::cluster::types::{
    CollectionOptions, IndexDescriptor, IndexFilter, Namespace, NodeId, NodeRole,
};
use crate::sim::store::{ApplyMode, StoreOp, StoreState};

/// Replica set configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Total node count (one primary, the rest secondaries)
    pub nodes: usize,
    /// Bound on primary election during bootstrap
    pub election_timeout: Duration,
    /// Bound on the replication barrier
    pub replication_timeout: Duration,
    /// Artificial per-operation apply lag on secondaries
    pub apply_lag: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nodes: 3,
            election_timeout: Duration::from_secs(10),
            replication_timeout: Duration::from_secs(10),
            apply_lag: Duration::from_millis(1),
        }
    }
}

type Oplog = Arc<RwLock<Vec<StoreOp>>>;

/// Write side held only by the primary node
struct PrimaryWriter {
    oplog: Oplog,
    head_tx: watch::Sender<u64>,
}

/// One node of the in-process replica set
pub struct SimNode {
    id: NodeId,
    role: NodeRole,
    state: Arc<RwLock<StoreState>>,
    unavailable: AtomicBool,
    writer: Option<PrimaryWriter>,
}

impl SimNode {
    fn new(id: NodeId, role: NodeRole, writer: Option<PrimaryWriter>) -> Self {
        Self {
            id,
            role,
            state: Arc::new(RwLock::new(StoreState::new())),
            unavailable: AtomicBool::new(false),
            writer,
        }
    }

    /// Inject or clear an availability fault
    ///
    /// While unavailable, catalog queries fail instead of answering; used to
    /// exercise the probe's error propagation.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> NodeResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(NodeError::Unavailable {
                node: self.id,
                reason: "injected fault".to_string(),
            });
        }
        Ok(())
    }

    /// Apply on the primary and append to the oplog
    fn execute(&self, op: StoreOp) -> NodeResult<()> {
        self.check_available()?;
        let writer = self.writer.as_ref().ok_or(NodeError::NotPrimary {
            node: self.id,
        })?;
        self.state.write().apply(&op, ApplyMode::Primary);
        let head = {
            let mut oplog = writer.oplog.write();
            oplog.push(op);
            oplog.len() as u64
        };
        let _ = writer.head_tx.send(head);
        Ok(())
    }

    fn validate_namespace(&self, namespace: &Namespace) -> NodeResult<()> {
        if !namespace.is_valid() {
            return Err(NodeError::InvalidCommand(format!(
                "empty namespace component in '{}'",
                namespace
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentNode for SimNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn role(&self) -> NodeRole {
        self.role
    }

    async fn create_collection(
        &self,
        namespace: &Namespace,
        options: &CollectionOptions,
    ) -> NodeResult<()> {
        self.validate_namespace(namespace)?;
        if options.capped && options.size.unwrap_or(0) == 0 {
            return Err(NodeError::InvalidCommand(
                "capped collection requires a positive size".to_string(),
            ));
        }
        if self.state.read().collection_exists(namespace) {
            return Err(NodeError::Command(format!(
                "collection '{}' already exists",
                namespace
            )));
        }
        tracing::debug!(node = self.id, %namespace, capped = options.capped, "create collection");
        self.execute(StoreOp::Create {
            namespace: namespace.clone(),
            options: options.clone(),
        })
    }

    async fn convert_to_capped(&self, namespace: &Namespace, size: u64) -> NodeResult<()> {
        self.validate_namespace(namespace)?;
        if size == 0 {
            return Err(NodeError::InvalidCommand(
                "convertToCapped requires a positive size".to_string(),
            ));
        }
        if !self.state.read().collection_exists(namespace) {
            return Err(NodeError::Command(format!(
                "collection '{}' does not exist",
                namespace
            )));
        }
        tracing::debug!(node = self.id, %namespace, size, "convert to capped");
        self.execute(StoreOp::ConvertToCapped {
            namespace: namespace.clone(),
            size,
        })
    }

    async fn drop_collection(&self, namespace: &Namespace) -> NodeResult<()> {
        self.validate_namespace(namespace)?;
        tracing::debug!(node = self.id, %namespace, "drop collection");
        self.execute(StoreOp::Drop {
            namespace: namespace.clone(),
        })
    }

    async fn insert(&self, namespace: &Namespace, document: Value) -> NodeResult<()> {
        self.validate_namespace(namespace)?;
        self.execute(StoreOp::Insert {
            namespace: namespace.clone(),
            document,
        })
    }

    async fn query_indexes(&self, filter: &IndexFilter) -> NodeResult<Vec<IndexDescriptor>> {
        self.check_available()?;
        Ok(self.state.read().query_indexes(filter))
    }
}

/// Handle owned by the driver for the lifetime of one verification run
pub struct SimReplicaSet {
    primary: Arc<SimNode>,
    secondaries: Vec<Arc<SimNode>>,
    head_rx: watch::Receiver<u64>,
    applied: Vec<watch::Receiver<u64>>,
    tasks: Mutex<Option<Vec<(oneshot::Sender<()>, JoinHandle<()>)>>>,
    config: SimConfig,
}

impl SimReplicaSet {
    /// Start a node set and elect the primary
    ///
    /// Blocks until every secondary's apply task has come up, bounded by
    /// the election timeout; expiry aborts the spawned tasks and fails the
    /// bootstrap rather than hanging.
    pub async fn bootstrap(config: SimConfig) -> ClusterResult<Self> {
        if config.nodes < 2 {
            return Err(ClusterError::InvalidTopology(format!(
                "need at least 2 nodes (one primary, one secondary), got {}",
                config.nodes
            )));
        }

        let oplog: Oplog = Arc::new(RwLock::new(Vec::new()));
        let (head_tx, head_rx) = watch::channel(0u64);

        let primary = Arc::new(SimNode::new(
            1,
            NodeRole::Primary,
            Some(PrimaryWriter {
                oplog: oplog.clone(),
                head_tx,
            }),
        ));

        let mut secondaries = Vec::new();
        let mut applied = Vec::new();
        let mut tasks = Vec::new();
        let mut ready = Vec::new();
        for i in 0..config.nodes - 1 {
            let node = Arc::new(SimNode::new(i as NodeId + 2, NodeRole::Secondary, None));
            let (applied_tx, applied_rx) = watch::channel(0u64);
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            let (ready_tx, ready_rx) = oneshot::channel();
            let handle = tokio::spawn(replay_loop(
                node.state.clone(),
                oplog.clone(),
                head_rx.clone(),
                applied_tx,
                ready_tx,
                shutdown_rx,
                config.apply_lag,
            ));
            secondaries.push(node);
            applied.push(applied_rx);
            tasks.push((shutdown_tx, handle));
            ready.push(ready_rx);
        }

        // Membership initiation: the primary is usable only once every
        // apply task is up. Bounded, so a stuck runtime surfaces as an
        // election failure instead of a hang.
        for ready_rx in ready {
            match tokio::time::timeout(config.election_timeout, ready_rx).await {
                Ok(Ok(())) => {}
                _ => {
                    for (_, handle) in tasks {
                        handle.abort();
                    }
                    return Err(ClusterError::ElectionTimeout(config.election_timeout));
                }
            }
        }

        tracing::info!(
            nodes = config.nodes,
            primary = primary.id(),
            "replica set bootstrapped, primary elected"
        );

        Ok(Self {
            primary,
            secondaries,
            head_rx,
            applied,
            tasks: Mutex::new(Some(tasks)),
            config,
        })
    }

    /// The primary node, concretely typed (for fault injection in tests)
    pub fn primary_node(&self) -> Arc<SimNode> {
        self.primary.clone()
    }

    /// Secondary nodes, concretely typed (for fault injection in tests)
    pub fn secondary_nodes(&self) -> Vec<Arc<SimNode>> {
        self.secondaries.clone()
    }
}

#[async_trait]
impl ReplicaSet for SimReplicaSet {
    fn primary(&self) -> Arc<dyn DocumentNode> {
        self.primary.clone()
    }

    fn secondaries(&self) -> Vec<Arc<dyn DocumentNode>> {
        self.secondaries
            .iter()
            .map(|n| n.clone() as Arc<dyn DocumentNode>)
            .collect()
    }

    async fn await_replication(&self) -> ClusterResult<()> {
        let head = *self.head_rx.borrow();
        let timeout = self.config.replication_timeout;
        for (node, rx) in self.secondaries.iter().zip(self.applied.iter()) {
            let mut rx = rx.clone();
            // Drop the watch ref before matching so the receiver can be
            // re-read when building the timeout error.
            let outcome = tokio::time::timeout(timeout, rx.wait_for(|applied| *applied >= head))
                .await
                .map(|r| r.map(|_| ()));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    return Err(ClusterError::Node(NodeError::Unavailable {
                        node: node.id(),
                        reason: "apply task terminated".to_string(),
                    }));
                }
                Err(_) => {
                    return Err(ClusterError::ReplicationTimeout {
                        timeout,
                        node: node.id(),
                        applied: *rx.borrow(),
                        head,
                    });
                }
            }
        }
        tracing::debug!(head, "replication barrier passed");
        Ok(())
    }

    async fn shutdown(&self) -> ClusterResult<()> {
        let tasks = self.tasks.lock().take();
        let Some(tasks) = tasks else {
            return Ok(());
        };
        for (shutdown_tx, handle) in tasks {
            let _ = shutdown_tx.send(());
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "secondary apply task join failed");
            }
        }
        tracing::info!("replica set shut down");
        Ok(())
    }
}

impl Drop for SimReplicaSet {
    fn drop(&mut self) {
        // Backstop if shutdown was never called: do not leak apply tasks.
        if let Some(tasks) = self.tasks.lock().take() {
            for (_, handle) in tasks {
                handle.abort();
            }
        }
    }
}

/// Replay loop run by each secondary
async fn replay_loop(
    state: Arc<RwLock<StoreState>>,
    oplog: Oplog,
    mut head_rx: watch::Receiver<u64>,
    applied_tx: watch::Sender<u64>,
    ready_tx: oneshot::Sender<()>,
    mut shutdown_rx: oneshot::Receiver<()>,
    apply_lag: Duration,
) {
    let _ = ready_tx.send(());
    let mut applied: u64 = 0;
    loop {
        tokio::select! {
            changed = head_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut shutdown_rx => break,
        }
        let head = *head_rx.borrow_and_update();
        while applied < head {
            let op = { oplog.read()[applied as usize].clone() };
            tokio::time::sleep(apply_lag).await;
            state.write().apply(&op, ApplyMode::Replay);
            applied += 1;
            let _ = applied_tx.send(applied);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::types::KeyPattern;
    use serde_json::json;

    fn quick_config() -> SimConfig {
        SimConfig {
            apply_lag: Duration::from_micros(100),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_degenerate_topology() {
        let config = SimConfig {
            nodes: 1,
            ..quick_config()
        };
        assert!(matches!(
            SimReplicaSet::bootstrap(config).await,
            Err(ClusterError::InvalidTopology(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_election_wait_is_bounded() {
        // A zero timeout expires before the spawned apply tasks can signal
        // readiness on a current-thread runtime.
        let config = SimConfig {
            election_timeout: Duration::ZERO,
            ..quick_config()
        };
        assert!(matches!(
            SimReplicaSet::bootstrap(config).await,
            Err(ClusterError::ElectionTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_writes_reach_secondaries_after_barrier() {
        let set = SimReplicaSet::bootstrap(quick_config()).await.unwrap();
        let ns = Namespace::new("dbname", "coll1");

        let primary = set.primary();
        primary
            .create_collection(&ns, &CollectionOptions::default())
            .await
            .unwrap();
        for _ in 0..10 {
            primary.insert(&ns, json!({"a": 1000})).await.unwrap();
        }
        set.await_replication().await.unwrap();

        let filter = IndexFilter::exact(&ns, KeyPattern::id());
        for secondary in set.secondaries() {
            let indexes = secondary.query_indexes(&filter).await.unwrap();
            assert_eq!(indexes.len(), 1, "node {}", secondary.id());
        }

        set.shutdown().await.unwrap();
        // Second shutdown is a no-op.
        set.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_secondary_rejects_writes() {
        let set = SimReplicaSet::bootstrap(quick_config()).await.unwrap();
        let ns = Namespace::new("dbname", "coll1");

        let secondaries = set.secondaries();
        let err = secondaries[0]
            .create_collection(&ns, &CollectionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::NotPrimary { .. }));

        set.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable_node_fails_catalog_query() {
        let set = SimReplicaSet::bootstrap(quick_config()).await.unwrap();

        let nodes = set.secondary_nodes();
        let node = &nodes[0];
        node.set_unavailable(true);
        let err = node
            .query_indexes(&IndexFilter::database("dbname"))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Unavailable { .. }));

        node.set_unavailable(false);
        assert!(node
            .query_indexes(&IndexFilter::database("dbname"))
            .await
            .is_ok());

        set.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_commands_rejected() {
        let set = SimReplicaSet::bootstrap(quick_config()).await.unwrap();
        let primary = set.primary();

        let err = primary
            .create_collection(&Namespace::new("", "coll"), &CollectionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidCommand(_)));

        let err = primary
            .create_collection(
                &Namespace::new("dbname", "coll0"),
                &CollectionOptions {
                    capped: true,
                    size: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidCommand(_)));

        let err = primary
            .convert_to_capped(&Namespace::new("dbname", "missing"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Command(_)));

        set.shutdown().await.unwrap();
    }
}
