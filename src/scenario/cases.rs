//! Declarative scenario cases
//!
//! Each case is data: a namespace, a document to populate with, a schema
//! operation sequence, and the expected index-presence vector. One shared
//! driver runs them all, so adding a case is a data change.

use serde_json::{json, Value};

use crate::cluster::types::Namespace;

/// One step of a case's primary-side operation sequence
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaStep {
    /// Create the collection capped with the given byte capacity
    CreateCapped { size: u64 },
    /// Create the collection uncapped
    CreateNormal,
    /// Insert the case's document `count` times
    Populate { count: usize },
    /// Block until all secondaries have applied everything so far
    AwaitReplication,
    /// Mid-scenario precondition: the primary must hold the primary-key
    /// index right now; failure aborts with a setup error, not a mismatch
    RequirePrimaryIdIndex,
    /// Convert the collection to capped form in place
    ConvertToCapped { size: u64 },
}

/// A complete scenario case descriptor
#[derive(Debug, Clone)]
pub struct ScenarioCase {
    /// Case identifier, used in logs and failure reports
    pub id: &'static str,
    /// Database name
    pub database: &'static str,
    /// Collection name
    pub collection: &'static str,
    /// Document inserted by `Populate` steps
    pub document: Value,
    /// Primary-side operation sequence
    pub steps: Vec<SchemaStep>,
    /// Expected primary-key index presence on the primary
    pub expect_primary: bool,
    /// Expected primary-key index presence on every secondary
    pub expect_secondary: bool,
}

impl ScenarioCase {
    /// Namespace under test
    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.database, self.collection)
    }
}

/// The built-in cases
///
/// Case 1: a collection capped at creation time never gets the primary-key
/// index, on any node. Case 2: a normal collection converted to capped drops
/// the index on the primary while secondaries, which replay the conversion
/// as a bulk reload, keep it.
pub fn builtin_cases() -> Vec<ScenarioCase> {
    vec![
        ScenarioCase {
            id: "capped-at-creation",
            database: "dbname",
            collection: "coll0",
            document: json!({"a": 1000}),
            steps: vec![
                SchemaStep::CreateCapped { size: 1024 },
                SchemaStep::Populate { count: 500 },
            ],
            expect_primary: false,
            expect_secondary: false,
        },
        ScenarioCase {
            id: "convert-to-capped",
            database: "dbname",
            collection: "coll1",
            document: json!({"a": 1000}),
            steps: vec![
                SchemaStep::CreateNormal,
                SchemaStep::Populate { count: 500 },
                SchemaStep::AwaitReplication,
                SchemaStep::RequirePrimaryIdIndex,
                SchemaStep::ConvertToCapped { size: 1024 },
            ],
            expect_primary: false,
            expect_secondary: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_cases_are_the_two_literal_scenarios() {
        let cases = builtin_cases();
        assert_eq!(cases.len(), 2);

        let capped = &cases[0];
        assert_eq!(capped.namespace().to_string(), "dbname.coll0");
        assert_eq!(capped.steps[0], SchemaStep::CreateCapped { size: 1024 });
        assert_eq!(capped.steps[1], SchemaStep::Populate { count: 500 });
        assert!(!capped.expect_primary);
        assert!(!capped.expect_secondary);

        let convert = &cases[1];
        assert_eq!(convert.namespace().to_string(), "dbname.coll1");
        assert!(convert
            .steps
            .contains(&SchemaStep::RequirePrimaryIdIndex));
        assert_eq!(
            convert.steps.last(),
            Some(&SchemaStep::ConvertToCapped { size: 1024 })
        );
        assert!(!convert.expect_primary);
        assert!(convert.expect_secondary);
    }
}
