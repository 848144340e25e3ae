//! Scenario orchestration
//!
//! - `cases`: declarative case descriptors and the two built-in scenarios
//! - `driver`: the shared phase-sequenced driver and the run entry point

pub mod cases;
pub mod driver;

pub use cases::{builtin_cases, ScenarioCase, SchemaStep};
pub use driver::{run_scenarios, ScenarioDriver};
