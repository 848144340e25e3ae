//! In-process replica set implementation
//!
//! Backs the `cluster` traits with an in-memory document store per node and
//! asynchronous log replay for secondaries, including the store's capped
//! collection metadata quirk: converting a collection to capped drops the
//! primary-key index on the node applying the conversion directly, while
//! nodes replaying the conversion from the log rebuild the collection and
//! re-register that index.

pub mod replica;
pub mod store;

pub use replica::{SimConfig, SimNode, SimReplicaSet};
pub use store::{ApplyMode, StoreOp, StoreState};
