//! Core identifiers and catalog descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

/// Node identifier
pub type NodeId = u64;

/// Role a node currently plays in the replica set
///
/// Roles can change over a cluster's lifetime (failover); the harness reads
/// the role at probe time and reports it alongside each observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// Accepts writes, authoritative log source
    Primary,
    /// Applies the primary's log asynchronously
    Secondary,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Primary => write!(f, "primary"),
            NodeRole::Secondary => write!(f, "secondary"),
        }
    }
}

/// A (database, collection) pair identifying a collection across all nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Database name
    pub database: String,
    /// Collection name
    pub collection: String,
}

impl Namespace {
    /// Create a new namespace
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Check that both parts are non-empty
    pub fn is_valid(&self) -> bool {
        !self.database.is_empty() && !self.collection.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Index key pattern over a single field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPattern {
    /// Indexed field name
    pub field: String,
}

impl KeyPattern {
    /// Key pattern over an arbitrary field
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// The primary-key pattern: the automatic index on the identity field
    pub fn id() -> Self {
        Self::new("_id")
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {}: 1 }}", self.field)
    }
}

/// An entry in a node's index catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Collection the index belongs to
    pub namespace: Namespace,
    /// Indexed key pattern
    pub key: KeyPattern,
    /// Index name
    pub name: String,
}

impl IndexDescriptor {
    /// Create a new index descriptor
    pub fn new(namespace: Namespace, key: KeyPattern, name: impl Into<String>) -> Self {
        Self {
            namespace,
            key,
            name: name.into(),
        }
    }

    /// The automatic primary-key index for a namespace
    pub fn primary_key(namespace: Namespace) -> Self {
        Self::new(namespace, KeyPattern::id(), "_id_")
    }
}

impl fmt::Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} key={} name={}", self.namespace, self.key, self.name)
    }
}

/// Options for collection creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOptions {
    /// Fixed-size collection that evicts oldest documents on overflow
    pub capped: bool,
    /// Byte capacity, required when capped
    pub size: Option<u64>,
}

impl CollectionOptions {
    /// Options for a capped collection with the given byte capacity
    pub fn capped(size: u64) -> Self {
        Self {
            capped: true,
            size: Some(size),
        }
    }
}

/// Filter for catalog queries
///
/// Matches index descriptors by database, optionally narrowed to one
/// collection and one key pattern. A database-only filter yields the full
/// catalog dump used in failure diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFilter {
    /// Database to search
    pub database: String,
    /// Restrict to one collection
    pub collection: Option<String>,
    /// Restrict to one key pattern
    pub key: Option<KeyPattern>,
}

impl IndexFilter {
    /// Match every index in a database
    pub fn database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: None,
            key: None,
        }
    }

    /// Match indexes on one namespace with one key pattern
    pub fn exact(namespace: &Namespace, key: KeyPattern) -> Self {
        Self {
            database: namespace.database.clone(),
            collection: Some(namespace.collection.clone()),
            key: Some(key),
        }
    }

    /// Check whether a descriptor matches this filter
    pub fn matches(&self, descriptor: &IndexDescriptor) -> bool {
        if descriptor.namespace.database != self.database {
            return false;
        }
        if let Some(coll) = &self.collection {
            if &descriptor.namespace.collection != coll {
                return false;
            }
        }
        if let Some(key) = &self.key {
            if &descriptor.key != key {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_display_and_validity() {
        let ns = Namespace::new("dbname", "coll0");
        assert_eq!(ns.to_string(), "dbname.coll0");
        assert!(ns.is_valid());
        assert!(!Namespace::new("", "coll0").is_valid());
        assert!(!Namespace::new("dbname", "").is_valid());
    }

    #[test]
    fn test_primary_key_descriptor() {
        let idx = IndexDescriptor::primary_key(Namespace::new("dbname", "coll1"));
        assert_eq!(idx.key, KeyPattern::id());
        assert_eq!(idx.name, "_id_");
        assert_eq!(idx.key.to_string(), "{ _id: 1 }");
    }

    #[test]
    fn test_index_filter_matching() {
        let ns = Namespace::new("dbname", "coll1");
        let idx = IndexDescriptor::primary_key(ns.clone());

        assert!(IndexFilter::database("dbname").matches(&idx));
        assert!(!IndexFilter::database("other").matches(&idx));

        let exact = IndexFilter::exact(&ns, KeyPattern::id());
        assert!(exact.matches(&idx));

        let wrong_key = IndexFilter::exact(&ns, KeyPattern::new("a"));
        assert!(!wrong_key.matches(&idx));

        let wrong_coll = IndexFilter::exact(&Namespace::new("dbname", "coll0"), KeyPattern::id());
        assert!(!wrong_coll.matches(&idx));
    }
}
