//! In-memory document store state for one node
//!
//! Models exactly the metadata behavior the harness verifies:
//! - creating a normal collection auto-creates the primary-key index
//! - creating a capped collection omits it
//! - converting to capped drops the index when applied directly (primary)
//!   but recreates it when replayed from the log (secondaries rebuild the
//!   collection as a bulk reload, which re-registers index definitions)

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cluster::types::{
    CollectionOptions, IndexDescriptor, IndexFilter, Namespace,
};

/// A replicated schema or data operation
///
/// Entries in the oplog carry these; the primary applies them directly and
/// secondaries replay them in sequence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreOp {
    /// Create a collection
    Create {
        namespace: Namespace,
        options: CollectionOptions,
    },
    /// Insert one document
    Insert { namespace: Namespace, document: Value },
    /// Drop a collection and its indexes
    Drop { namespace: Namespace },
    /// Convert an existing collection to capped form
    ConvertToCapped { namespace: Namespace, size: u64 },
}

/// How an operation reaches a node's store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Executed directly on the node accepting the write
    Primary,
    /// Replayed from the replication log on a secondary
    Replay,
}

/// One collection's documents and catalog entries
#[derive(Debug, Clone, Default)]
pub struct CollectionState {
    /// Capped collections evict oldest documents past capacity
    pub capped: bool,
    /// Byte capacity when capped
    pub capacity: Option<u64>,
    /// Documents in insertion order
    pub documents: VecDeque<Value>,
    /// Approximate stored bytes, for eviction
    pub bytes: u64,
    /// Index catalog entries for this collection
    pub indexes: Vec<IndexDescriptor>,
}

impl CollectionState {
    fn with_options(namespace: &Namespace, options: &CollectionOptions) -> Self {
        let mut state = Self {
            capped: options.capped,
            capacity: options.size,
            ..Default::default()
        };
        // Normal collections get the automatic primary-key index;
        // capped collections intentionally omit it.
        if !options.capped {
            state
                .indexes
                .push(IndexDescriptor::primary_key(namespace.clone()));
        }
        state
    }

    fn insert(&mut self, document: Value) {
        let size = serde_json::to_string(&document)
            .map(|s| s.len() as u64)
            .unwrap_or(0);
        self.documents.push_back(document);
        self.bytes += size;
        if self.capped {
            let capacity = self.capacity.unwrap_or(u64::MAX);
            while self.bytes > capacity && self.documents.len() > 1 {
                if let Some(evicted) = self.documents.pop_front() {
                    let evicted_size = serde_json::to_string(&evicted)
                        .map(|s| s.len() as u64)
                        .unwrap_or(0);
                    self.bytes = self.bytes.saturating_sub(evicted_size);
                }
            }
        }
    }
}

/// Full store state for one node
#[derive(Debug, Default)]
pub struct StoreState {
    collections: HashMap<Namespace, CollectionState>,
}

impl StoreState {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one operation
    ///
    /// `mode` selects the primary or replay semantics; the two differ only
    /// for `ConvertToCapped`.
    pub fn apply(&mut self, op: &StoreOp, mode: ApplyMode) {
        match op {
            StoreOp::Create { namespace, options } => {
                self.collections
                    .entry(namespace.clone())
                    .or_insert_with(|| CollectionState::with_options(namespace, options));
            }
            StoreOp::Insert {
                namespace,
                document,
            } => {
                let coll = self.collections.entry(namespace.clone()).or_insert_with(|| {
                    CollectionState::with_options(namespace, &CollectionOptions::default())
                });
                coll.insert(document.clone());
            }
            StoreOp::Drop { namespace } => {
                self.collections.remove(namespace);
            }
            StoreOp::ConvertToCapped { namespace, size } => {
                if let Some(coll) = self.collections.get_mut(namespace) {
                    coll.capped = true;
                    coll.capacity = Some(*size);
                    while coll.bytes > *size && coll.documents.len() > 1 {
                        if let Some(evicted) = coll.documents.pop_front() {
                            let evicted_size = serde_json::to_string(&evicted)
                                .map(|s| s.len() as u64)
                                .unwrap_or(0);
                            coll.bytes = coll.bytes.saturating_sub(evicted_size);
                        }
                    }
                    match mode {
                        // Direct conversion drops the primary-key index.
                        ApplyMode::Primary => {
                            coll.indexes.retain(|idx| idx.name != "_id_");
                        }
                        // Replay rebuilds the collection wholesale and ends up
                        // re-registering the primary-key index.
                        ApplyMode::Replay => {
                            if !coll.indexes.iter().any(|idx| idx.name == "_id_") {
                                coll.indexes
                                    .push(IndexDescriptor::primary_key(namespace.clone()));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Whether a collection exists
    pub fn collection_exists(&self, namespace: &Namespace) -> bool {
        self.collections.contains_key(namespace)
    }

    /// Collection state, if present
    pub fn collection(&self, namespace: &Namespace) -> Option<&CollectionState> {
        self.collections.get(namespace)
    }

    /// All index descriptors matching a filter, in a stable order
    pub fn query_indexes(&self, filter: &IndexFilter) -> Vec<IndexDescriptor> {
        let mut matches: Vec<IndexDescriptor> = self
            .collections
            .values()
            .flat_map(|coll| coll.indexes.iter())
            .filter(|idx| filter.matches(idx))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            (a.namespace.to_string(), a.name.clone()).cmp(&(b.namespace.to_string(), b.name.clone()))
        });
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::types::KeyPattern;
    use serde_json::json;

    fn ns(coll: &str) -> Namespace {
        Namespace::new("dbname", coll)
    }

    fn id_filter(namespace: &Namespace) -> IndexFilter {
        IndexFilter::exact(namespace, KeyPattern::id())
    }

    #[test]
    fn test_normal_create_gains_primary_key_index() {
        let mut store = StoreState::new();
        store.apply(
            &StoreOp::Create {
                namespace: ns("coll1"),
                options: CollectionOptions::default(),
            },
            ApplyMode::Primary,
        );
        assert_eq!(store.query_indexes(&id_filter(&ns("coll1"))).len(), 1);
    }

    #[test]
    fn test_capped_create_omits_primary_key_index() {
        let mut store = StoreState::new();
        store.apply(
            &StoreOp::Create {
                namespace: ns("coll0"),
                options: CollectionOptions::capped(1024),
            },
            ApplyMode::Primary,
        );
        assert!(store.collection_exists(&ns("coll0")));
        assert!(store.query_indexes(&id_filter(&ns("coll0"))).is_empty());
    }

    #[test]
    fn test_convert_drops_index_on_primary_but_not_on_replay() {
        let create = StoreOp::Create {
            namespace: ns("coll1"),
            options: CollectionOptions::default(),
        };
        let convert = StoreOp::ConvertToCapped {
            namespace: ns("coll1"),
            size: 1024,
        };

        let mut primary = StoreState::new();
        primary.apply(&create, ApplyMode::Primary);
        primary.apply(&convert, ApplyMode::Primary);
        assert!(primary.query_indexes(&id_filter(&ns("coll1"))).is_empty());
        assert!(primary.collection(&ns("coll1")).unwrap().capped);

        let mut secondary = StoreState::new();
        secondary.apply(&create, ApplyMode::Replay);
        secondary.apply(&convert, ApplyMode::Replay);
        assert_eq!(secondary.query_indexes(&id_filter(&ns("coll1"))).len(), 1);
        assert!(secondary.collection(&ns("coll1")).unwrap().capped);
    }

    #[test]
    fn test_drop_removes_collection_and_indexes() {
        let mut store = StoreState::new();
        store.apply(
            &StoreOp::Create {
                namespace: ns("coll1"),
                options: CollectionOptions::default(),
            },
            ApplyMode::Primary,
        );
        store.apply(
            &StoreOp::Drop {
                namespace: ns("coll1"),
            },
            ApplyMode::Primary,
        );
        assert!(!store.collection_exists(&ns("coll1")));
        assert!(store.query_indexes(&IndexFilter::database("dbname")).is_empty());

        // Dropping again is a no-op.
        store.apply(
            &StoreOp::Drop {
                namespace: ns("coll1"),
            },
            ApplyMode::Primary,
        );
    }

    #[test]
    fn test_capped_insert_evicts_oldest() {
        let mut store = StoreState::new();
        store.apply(
            &StoreOp::Create {
                namespace: ns("coll0"),
                options: CollectionOptions::capped(64),
            },
            ApplyMode::Primary,
        );
        for _ in 0..500 {
            store.apply(
                &StoreOp::Insert {
                    namespace: ns("coll0"),
                    document: json!({"a": 1000}),
                },
                ApplyMode::Primary,
            );
        }
        let coll = store.collection(&ns("coll0")).unwrap();
        assert!(coll.bytes <= 64 || coll.documents.len() == 1);
        assert!(coll.documents.len() < 500);
    }
}
