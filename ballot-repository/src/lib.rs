//! # Ballot Repository
//! This crate provides the storage boundary for vote records. It includes
//! definitions for errors and interfaces, a PostgreSQL implementation backed
//! by sqlx, and an in-memory implementation for tests and embedded use.
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use errors::VoteStoreError;
pub use interfaces::{VoteStore, VoteTransaction};
pub use memory::InMemoryVoteStore;
pub use postgres::PostgresVoteStore;
