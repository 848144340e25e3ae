//! replvet - replica-set metadata verification harness
//!
//! Verifies an invariant of a replicated document store: whether a
//! collection carries its implicit primary-key index must agree with the
//! collection's capped-ness, on the primary and on every secondary.
//! Collections capped at creation lack the index everywhere; collections
//! converted to capped drop it on the primary while secondaries, which
//! replay the conversion as a bulk reload, keep it.
//!
//! Layout:
//! - `cluster`: data model and the traits a running replica set is reached
//!   through
//! - `sim`: in-process replica set implementing those traits
//! - `probe`: read-only index catalog queries
//! - `scenario`: declarative cases and the phase-sequenced driver
//! - `report`: expected-vs-observed comparison and diagnostics
//! - `error`: run-level failure taxonomy

pub mod cluster;
pub mod error;
pub mod probe;
pub mod report;
pub mod scenario;
pub mod sim;
