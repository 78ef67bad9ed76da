//! PostgreSQL implementation of the vote repository.
//!
//! ## Key Features
//!
//! - Connection pooling with `sqlx::PgPool`
//! - Transactions wrapping `sqlx::Transaction`, rolled back on drop
//! - Dynamic filters built with `QueryBuilder`, membership via `UNNEST`
//! - Summary columns on host tables locked with `SELECT ... FOR UPDATE`
//!
//! ## Database Tables
//!
//! - `ballot_votes`: individual vote records (see `migrations/`)
//! - host tables registered with a `SummaryLocation`: a JSONB summary column
mod vote_store;

pub use vote_store::{PostgresVoteStore, PostgresVoteTransaction};
