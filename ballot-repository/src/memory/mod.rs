//! In-memory implementation of the vote repository.
//!
//! Intended for tests and embedded use. Transactions take the store-wide lock
//! for their whole lifetime and stage their writes on a copy of the state, so
//! concurrent writers are serialized and a dropped transaction leaves no trace.
mod vote_store;

pub use vote_store::{InMemoryVoteStore, InMemoryVoteTransaction};
