//! Error types for the vote repository.
//! Consolidates the errors raised by every store implementation.
mod vote_store;

pub use vote_store::VoteStoreError;
