//! This module defines the `VoteStore` and `VoteTransaction` traits, the
//! interface between the voting engine and the underlying data store.
use ballot_shared::types::{
    EntityId, NewVote, SummaryLocation, Vote, VoteFilter, VoteId, VoteOrder, VoteSummary,
    VoteTally, Weight,
};

use crate::errors::VoteStoreError;

/// A store of vote records.
///
/// Read methods on the store itself run outside any transaction and may
/// observe concurrent writes. Every mutation goes through a [`VoteTransaction`]
/// obtained from [`VoteStore::begin`].
#[async_trait::async_trait]
pub trait VoteStore: Send + Sync {
    /// Opens a transaction. Dropping it without committing rolls it back.
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, VoteStoreError>;

    /// Returns the votes matching `filter` in the requested order.
    async fn find_votes(
        &self,
        filter: &VoteFilter,
        order: VoteOrder,
    ) -> Result<Vec<Vote>, VoteStoreError>;

    /// Returns `true` if at least one vote matches `filter`.
    async fn vote_exists(&self, filter: &VoteFilter) -> Result<bool, VoteStoreError>;

    /// Counts and sums the weights of the votes matching `filter`.
    async fn tally(&self, filter: &VoteFilter) -> Result<VoteTally, VoteStoreError>;

    /// Reads the cached summary stored for the entity `id` at `location`
    /// without locking it.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(summary))` - The entity exists; an unset column reads as empty
    /// * `Ok(None)` - No entity with that key exists
    async fn read_summary(
        &self,
        location: &SummaryLocation,
        id: EntityId,
    ) -> Result<Option<VoteSummary>, VoteStoreError>;

    /// Checks that the vote table exists.
    async fn check_schema(&self) -> Result<bool, VoteStoreError>;
}

/// A unit of work against a [`VoteStore`].
#[async_trait::async_trait]
pub trait VoteTransaction: Send {
    async fn find_votes(
        &mut self,
        filter: &VoteFilter,
        order: VoteOrder,
    ) -> Result<Vec<Vote>, VoteStoreError>;

    /// Inserts a vote and returns it with its assigned id and timestamps.
    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Vote, VoteStoreError>;

    /// Sets the flag and weight of an existing vote and refreshes `updated_at`.
    async fn update_vote(
        &mut self,
        id: VoteId,
        flag: bool,
        weight: Weight,
    ) -> Result<Vote, VoteStoreError>;

    /// Deletes every vote matching `filter` and returns how many were removed.
    async fn delete_votes(&mut self, filter: &VoteFilter) -> Result<u64, VoteStoreError>;

    async fn tally(&mut self, filter: &VoteFilter) -> Result<VoteTally, VoteStoreError>;

    /// Takes an exclusive lock on the entity row holding the summary and
    /// returns its current contents. Same `None` semantics as
    /// [`VoteStore::read_summary`].
    async fn lock_summary(
        &mut self,
        location: &SummaryLocation,
        id: EntityId,
    ) -> Result<Option<VoteSummary>, VoteStoreError>;

    /// Persists the whole summary mapping onto the entity row.
    async fn write_summary(
        &mut self,
        location: &SummaryLocation,
        id: EntityId,
        summary: &VoteSummary,
    ) -> Result<(), VoteStoreError>;

    async fn commit(self: Box<Self>) -> Result<(), VoteStoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), VoteStoreError>;
}
