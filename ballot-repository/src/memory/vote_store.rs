use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ballot_shared::types::{
    EntityId, EntityKey, NewVote, SummaryLocation, Vote, VoteFilter, VoteId, VoteOrder,
    VoteSummary, VoteTally, Weight,
};
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{VoteStore, VoteStoreError, VoteTransaction};

type SummaryKey = (String, String, EntityId);

fn summary_key(location: &SummaryLocation, id: EntityId) -> SummaryKey {
    (location.table.clone(), location.column.clone(), id)
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    votes: Vec<Vote>,
    next_id: VoteId,
    summaries: HashMap<SummaryKey, VoteSummary>,
    rejected_votables: HashSet<EntityKey>,
}

impl MemoryState {
    fn find(&self, filter: &VoteFilter, order: VoteOrder) -> Vec<Vote> {
        let mut votes: Vec<Vote> = self
            .votes
            .iter()
            .filter(|vote| filter.matches(vote))
            .cloned()
            .collect();

        match order {
            VoteOrder::Insertion => votes.sort_by_key(|vote| vote.id),
            VoteOrder::Latest => votes.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| b.id.cmp(&a.id))
            }),
        }
        if let Some(limit) = filter.limit {
            votes.truncate(limit);
        }
        votes
    }

    fn tally(&self, filter: &VoteFilter) -> VoteTally {
        self.votes
            .iter()
            .filter(|vote| filter.matches(vote))
            .fold(VoteTally::default(), |mut tally, vote| {
                if vote.flag {
                    tally.up += 1;
                    tally.up_weight += vote.weight;
                } else {
                    tally.down += 1;
                    tally.down_weight += vote.weight;
                }
                tally
            })
    }

    fn summary(&self, location: &SummaryLocation, id: EntityId) -> VoteSummary {
        self.summaries
            .get(&summary_key(location, id))
            .cloned()
            .unwrap_or_default()
    }

    fn check_writable(&self, votable: &EntityKey) -> Result<(), VoteStoreError> {
        if self.rejected_votables.contains(votable) {
            return Err(VoteStoreError::rejected(format!(
                "writes for {votable} are rejected"
            )));
        }
        Ok(())
    }
}

/// A vote store that keeps everything in process memory.
///
/// Every host entity is considered to exist, so summary reads never return
/// `None`; an entity whose summary was never written reads as empty.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVoteStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every stored vote in insertion order.
    pub async fn votes(&self) -> Vec<Vote> {
        self.state.lock().await.votes.clone()
    }

    /// Makes every insert or update of a vote on `votable` fail with
    /// [`VoteStoreError::Rejected`].
    #[cfg(any(test, feature = "test-util"))]
    pub async fn reject_writes_for(&self, votable: EntityKey) {
        self.state.lock().await.rejected_votables.insert(votable);
    }
}

#[async_trait]
impl VoteStore for InMemoryVoteStore {
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, VoteStoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(InMemoryVoteTransaction { guard, staged }))
    }

    async fn find_votes(
        &self,
        filter: &VoteFilter,
        order: VoteOrder,
    ) -> Result<Vec<Vote>, VoteStoreError> {
        Ok(self.state.lock().await.find(filter, order))
    }

    async fn vote_exists(&self, filter: &VoteFilter) -> Result<bool, VoteStoreError> {
        Ok(self
            .state
            .lock()
            .await
            .votes
            .iter()
            .any(|vote| filter.matches(vote)))
    }

    async fn tally(&self, filter: &VoteFilter) -> Result<VoteTally, VoteStoreError> {
        Ok(self.state.lock().await.tally(filter))
    }

    async fn read_summary(
        &self,
        location: &SummaryLocation,
        id: EntityId,
    ) -> Result<Option<VoteSummary>, VoteStoreError> {
        Ok(Some(self.state.lock().await.summary(location, id)))
    }

    async fn check_schema(&self) -> Result<bool, VoteStoreError> {
        Ok(true)
    }
}

/// Transaction over an [`InMemoryVoteStore`].
///
/// Holds the store lock until it is committed, rolled back or dropped.
pub struct InMemoryVoteTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl VoteTransaction for InMemoryVoteTransaction {
    async fn find_votes(
        &mut self,
        filter: &VoteFilter,
        order: VoteOrder,
    ) -> Result<Vec<Vote>, VoteStoreError> {
        Ok(self.staged.find(filter, order))
    }

    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Vote, VoteStoreError> {
        self.staged.check_writable(&vote.votable)?;

        self.staged.next_id += 1;
        let now = Utc::now();
        let stored = Vote {
            id: self.staged.next_id,
            votable: vote.votable.clone(),
            voter: vote.voter.clone(),
            flag: vote.flag,
            weight: vote.weight.get(),
            scope: vote.scope.clone(),
            created_at: now,
            updated_at: now,
        };
        self.staged.votes.push(stored.clone());
        Ok(stored)
    }

    async fn update_vote(
        &mut self,
        id: VoteId,
        flag: bool,
        weight: Weight,
    ) -> Result<Vote, VoteStoreError> {
        let index = self
            .staged
            .votes
            .iter()
            .position(|vote| vote.id == id)
            .ok_or(VoteStoreError::VoteNotFound(id))?;
        self.staged.check_writable(&self.staged.votes[index].votable)?;

        let vote = &mut self.staged.votes[index];
        vote.flag = flag;
        vote.weight = weight.get();
        vote.updated_at = Utc::now().max(vote.updated_at);
        Ok(vote.clone())
    }

    async fn delete_votes(&mut self, filter: &VoteFilter) -> Result<u64, VoteStoreError> {
        let before = self.staged.votes.len();
        self.staged.votes.retain(|vote| !filter.matches(vote));
        Ok((before - self.staged.votes.len()) as u64)
    }

    async fn tally(&mut self, filter: &VoteFilter) -> Result<VoteTally, VoteStoreError> {
        Ok(self.staged.tally(filter))
    }

    async fn lock_summary(
        &mut self,
        location: &SummaryLocation,
        id: EntityId,
    ) -> Result<Option<VoteSummary>, VoteStoreError> {
        Ok(Some(self.staged.summary(location, id)))
    }

    async fn write_summary(
        &mut self,
        location: &SummaryLocation,
        id: EntityId,
        summary: &VoteSummary,
    ) -> Result<(), VoteStoreError> {
        self.staged
            .summaries
            .insert(summary_key(location, id), summary.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), VoteStoreError> {
        let InMemoryVoteTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), VoteStoreError> {
        Ok(())
    }
}
