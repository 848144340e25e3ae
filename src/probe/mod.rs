//! Metadata probe
//!
//! Read-only catalog queries against a single node. The probe distinguishes
//! "no matching descriptor" (a legitimate answer) from "the node could not
//! answer" (an infrastructure failure that must not masquerade as `false`).

use crate::cluster::error::NodeResult;
use crate::cluster::traits::DocumentNode;
use crate::cluster::types::{IndexDescriptor, IndexFilter, KeyPattern, Namespace};

/// Check whether exactly one index matches the namespace and key pattern
///
/// Zero matches returns `Ok(false)`; a node that cannot answer returns the
/// underlying error so the caller can classify it as infrastructure failure.
pub async fn index_exists(
    node: &dyn DocumentNode,
    namespace: &Namespace,
    key: &KeyPattern,
) -> NodeResult<bool> {
    let filter = IndexFilter::exact(namespace, key.clone());
    let matches = node.query_indexes(&filter).await?;
    Ok(matches.len() == 1)
}

/// Full index catalog of one node for a database, for failure diagnostics
pub async fn catalog_dump(
    node: &dyn DocumentNode,
    database: &str,
) -> NodeResult<Vec<IndexDescriptor>> {
    node.query_indexes(&IndexFilter::database(database)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::error::NodeError;
    use crate::cluster::traits::ReplicaSet;
    use crate::cluster::types::CollectionOptions;
    use crate::sim::{SimConfig, SimReplicaSet};

    #[tokio::test]
    async fn test_index_exists_distinguishes_absent_from_unavailable() {
        let set = SimReplicaSet::bootstrap(SimConfig::default()).await.unwrap();
        let ns = Namespace::new("dbname", "coll1");
        let primary = set.primary();

        // Absent: collection does not exist at all.
        assert!(!index_exists(primary.as_ref(), &ns, &KeyPattern::id())
            .await
            .unwrap());

        primary
            .create_collection(&ns, &CollectionOptions::default())
            .await
            .unwrap();
        assert!(index_exists(primary.as_ref(), &ns, &KeyPattern::id())
            .await
            .unwrap());

        // Unavailable: an error, never a silent `false`.
        let node = set.primary_node();
        node.set_unavailable(true);
        let err = index_exists(node.as_ref(), &ns, &KeyPattern::id())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Unavailable { .. }));

        node.set_unavailable(false);
        set.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_catalog_dump_lists_all_indexes() {
        let set = SimReplicaSet::bootstrap(SimConfig::default()).await.unwrap();
        let primary = set.primary();

        primary
            .create_collection(&Namespace::new("dbname", "coll1"), &CollectionOptions::default())
            .await
            .unwrap();
        primary
            .create_collection(
                &Namespace::new("dbname", "coll0"),
                &CollectionOptions::capped(1024),
            )
            .await
            .unwrap();

        let dump = catalog_dump(primary.as_ref(), "dbname").await.unwrap();
        assert_eq!(dump.len(), 1);
        assert_eq!(dump[0].namespace.collection, "coll1");

        set.shutdown().await.unwrap();
    }
}
