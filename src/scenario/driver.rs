//! Scenario driver
//!
//! Runs each case through a fixed phase sequence on a single logical thread:
//! NamespaceReset -> PrimaryMutated -> ReplicationSettled -> Probed ->
//! Verified. Cases run strictly one after another; a case fully settles
//! before the next starts, since they share a cluster and its namespaces.

use std::sync::Arc;

use crate::cluster::error::{ClusterError, NodeError};
use crate::cluster::traits::{DocumentNode, ReplicaSet};
use crate::cluster::types::{CollectionOptions, KeyPattern, Namespace};
use crate::error::{Phase, RunError, RunResult};
use crate::probe;
use crate::report::{self, CatalogDump, NodeObservation};
use crate::scenario::cases::{ScenarioCase, SchemaStep};

/// Drives scenario cases against one replica set
///
/// Holds the cluster handle explicitly; there is no ambient cluster state.
pub struct ScenarioDriver<'a> {
    set: &'a dyn ReplicaSet,
}

impl<'a> ScenarioDriver<'a> {
    /// Create a driver for the given replica set
    pub fn new(set: &'a dyn ReplicaSet) -> Self {
        Self { set }
    }

    /// Run one case to its terminal state
    pub async fn run_case(&self, case: &ScenarioCase) -> RunResult<()> {
        let ns = case.namespace();
        let primary = self.set.primary();

        tracing::info!(case = case.id, namespace = %ns, phase = %Phase::NamespaceReset, "resetting namespace");
        primary
            .drop_collection(&ns)
            .await
            .map_err(ClusterError::from)?;
        self.set.await_replication().await?;

        tracing::info!(case = case.id, phase = %Phase::PrimaryMutated, "applying schema operations");
        for step in &case.steps {
            self.apply_step(case, &ns, primary.as_ref(), step).await?;
        }

        tracing::info!(case = case.id, phase = %Phase::ReplicationSettled, "awaiting replication barrier");
        self.set.await_replication().await?;

        tracing::info!(case = case.id, phase = %Phase::Probed, "probing index catalogs");
        let (observations, dumps) = self.probe_all(case, &ns).await?;
        for dump in &dumps {
            tracing::debug!(case = case.id, "{}", dump);
        }

        tracing::info!(case = case.id, phase = %Phase::Verified, "verifying expected vector");
        report::verify(case.id, &ns, observations, dumps)?;
        Ok(())
    }

    async fn apply_step(
        &self,
        case: &ScenarioCase,
        ns: &Namespace,
        primary: &dyn DocumentNode,
        step: &SchemaStep,
    ) -> RunResult<()> {
        match step {
            SchemaStep::CreateCapped { size } => {
                primary
                    .create_collection(ns, &CollectionOptions::capped(*size))
                    .await
                    .map_err(ClusterError::from)?;
            }
            SchemaStep::CreateNormal => {
                primary
                    .create_collection(ns, &CollectionOptions::default())
                    .await
                    .map_err(ClusterError::from)?;
            }
            SchemaStep::Populate { count } => {
                for _ in 0..*count {
                    primary
                        .insert(ns, case.document.clone())
                        .await
                        .map_err(ClusterError::from)?;
                }
            }
            SchemaStep::AwaitReplication => {
                self.set.await_replication().await?;
            }
            SchemaStep::RequirePrimaryIdIndex => {
                let present = probe::index_exists(primary, ns, &KeyPattern::id())
                    .await
                    .map_err(|e| probe_failure(primary.id(), e))?;
                if !present {
                    return Err(RunError::Setup {
                        case: case.id.to_string(),
                        phase: Phase::PrimaryMutated,
                        reason: format!(
                            "primary does not have the primary-key index on {}",
                            ns
                        ),
                    });
                }
            }
            SchemaStep::ConvertToCapped { size } => {
                primary
                    .convert_to_capped(ns, *size)
                    .await
                    .map_err(ClusterError::from)?;
            }
        }
        Ok(())
    }

    /// Probe the primary and every secondary, collecting observations and
    /// full catalog dumps in stable node order
    async fn probe_all(
        &self,
        case: &ScenarioCase,
        ns: &Namespace,
    ) -> RunResult<(Vec<NodeObservation>, Vec<CatalogDump>)> {
        let mut nodes: Vec<(Arc<dyn DocumentNode>, bool)> = Vec::new();
        nodes.push((self.set.primary(), case.expect_primary));
        for secondary in self.set.secondaries() {
            nodes.push((secondary, case.expect_secondary));
        }

        let mut observations = Vec::with_capacity(nodes.len());
        let mut dumps = Vec::with_capacity(nodes.len());
        for (node, expected) in nodes {
            let observed = probe::index_exists(node.as_ref(), ns, &KeyPattern::id())
                .await
                .map_err(|e| probe_failure(node.id(), e))?;
            observations.push(NodeObservation {
                node: node.id(),
                role: node.role(),
                expected,
                observed,
            });
            let indexes = probe::catalog_dump(node.as_ref(), &ns.database)
                .await
                .map_err(|e| probe_failure(node.id(), e))?;
            dumps.push(CatalogDump {
                node: node.id(),
                role: node.role(),
                indexes,
            });
        }
        Ok((observations, dumps))
    }
}

fn probe_failure(node: crate::cluster::types::NodeId, source: NodeError) -> RunError {
    RunError::Infrastructure(ClusterError::Probe { node, source })
}

/// Run a sequence of cases and tear the cluster down on every exit path
///
/// The first failing case aborts the run; shutdown still happens before the
/// error is surfaced.
pub async fn run_scenarios(set: &dyn ReplicaSet, cases: &[ScenarioCase]) -> RunResult<()> {
    let driver = ScenarioDriver::new(set);
    let mut outcome = Ok(());
    for case in cases {
        if let Err(e) = driver.run_case(case).await {
            outcome = Err(e);
            break;
        }
    }

    let teardown = set.shutdown().await;
    outcome?;
    teardown.map_err(RunError::from)?;
    Ok(())
}
