//! Error types for the voting engine.
//!
//! Resolution misses are not errors: they surface as `false`, `None` or an
//! empty listing. `BallotError` is reserved for setup defects, collaborator
//! failures and store outages on read paths.
use ballot_repository::VoteStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BallotError {
    /// A locator token was supplied but no [`Locator`](crate::resolver::Locator) is wired in.
    #[error("No locator is configured to resolve locator references")]
    LocatorNotConfigured,

    /// An entity directory or locator failed for a reason other than "not found".
    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Store error: {0}")]
    Store(#[from] VoteStoreError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BallotError {
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
