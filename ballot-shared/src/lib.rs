//! # Ballot Shared
//! This crate defines the data structures shared across the ballot workspace.
//! It includes polymorphic entity references, vote records, query filters,
//! cached summaries and the batch request/outcome types.
pub mod types;
