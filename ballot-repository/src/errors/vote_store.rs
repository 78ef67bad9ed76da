//! Error types for vote store operations.
use ballot_shared::types::VoteId;
use thiserror::Error;

/// Represents errors that can occur within a vote store.
///
/// Any of these raised inside a transaction means the transaction must be
/// rolled back; callers never observe a partial write.
#[derive(Debug, Error)]
pub enum VoteStoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Vote not found: {0}")]
    VoteNotFound(VoteId),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl VoteStoreError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}
