//! The vote ledger: casting, removing and querying individual votes.
//!
//! Each (voter, votable, scope) key holds at most one vote unless the caller
//! casts with `allow_duplicate`. When several rows share a key, the one with
//! the highest id is the one a later cast updates.
use std::sync::Arc;

use ballot_repository::{VoteStore, VoteStoreError, VoteTransaction};
use ballot_shared::types::{
    CastOutcome, EntityKey, NewVote, Scope, Vote, VoteFilter, VoteOrder, VoteQuery, Weight,
};
use tracing::{debug, warn};

use crate::errors::BallotError;
use crate::resolver::{EntityRef, IdentityResolver};
use crate::summary::SummaryCache;
use crate::words::{VoteWord, VoteWords};

/// Parameters of a single cast.
#[derive(Debug, Clone, PartialEq)]
pub struct CastBallot {
    pub scope: Scope,
    pub vote: VoteWord,
    /// Requested weight. Absent or non-positive values count as 1.
    pub weight: Option<i64>,
    /// Insert a new row even if the key already holds a vote.
    pub allow_duplicate: bool,
}

impl Default for CastBallot {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CastBallot {
    pub fn new(vote: impl Into<VoteWord>) -> Self {
        Self {
            scope: Scope::unscoped(),
            vote: vote.into(),
            weight: None,
            allow_duplicate: false,
        }
    }

    pub fn up() -> Self {
        Self::new(true)
    }

    pub fn down() -> Self {
        Self::new(false)
    }

    pub fn scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn weight(mut self, weight: i64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn allow_duplicate(mut self) -> Self {
        self.allow_duplicate = true;
        self
    }
}

fn key_filter(voter: &EntityKey, votable: &EntityKey, scope: &Scope) -> VoteFilter {
    VoteFilter::new()
        .voter(voter)
        .votable(votable)
        .scope(scope.clone())
}

/// Inserts or updates the vote for one key inside `tx`.
///
/// Returns `None` when the selected row already carries `flag` and `weight`,
/// in which case nothing is written.
pub(crate) async fn upsert_vote(
    tx: &mut dyn VoteTransaction,
    voter: &EntityKey,
    votable: &EntityKey,
    scope: &Scope,
    flag: bool,
    weight: Weight,
    allow_duplicate: bool,
) -> Result<Option<Vote>, VoteStoreError> {
    let existing = if allow_duplicate {
        None
    } else {
        tx.find_votes(&key_filter(voter, votable, scope), VoteOrder::Insertion)
            .await?
            .into_iter()
            .max_by_key(|vote| vote.id)
    };

    match existing {
        Some(vote) if vote.flag == flag && vote.weight == weight.get() => Ok(None),
        Some(vote) => Ok(Some(tx.update_vote(vote.id, flag, weight).await?)),
        None => {
            let new_vote = NewVote {
                votable: votable.clone(),
                voter: voter.clone(),
                flag,
                weight,
                scope: scope.clone(),
            };
            Ok(Some(tx.insert_vote(&new_vote).await?))
        }
    }
}

pub struct VoteLedger {
    store: Arc<dyn VoteStore>,
    resolver: Arc<IdentityResolver>,
    summaries: Arc<SummaryCache>,
    words: Arc<VoteWords>,
}

impl VoteLedger {
    pub fn new(
        store: Arc<dyn VoteStore>,
        resolver: Arc<IdentityResolver>,
        summaries: Arc<SummaryCache>,
        words: Arc<VoteWords>,
    ) -> Self {
        Self {
            store,
            resolver,
            summaries,
            words,
        }
    }

    async fn resolve_pair(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
    ) -> Result<Option<(EntityKey, EntityKey)>, BallotError> {
        let Some(voter) = self.resolver.resolve_voter(voter).await? else {
            return Ok(None);
        };
        let Some(votable) = self.resolver.resolve_votable(votable).await? else {
            return Ok(None);
        };
        Ok(Some((voter, votable)))
    }

    /// Casts a vote by `voter` on `votable`.
    ///
    /// The vote word is interpreted as up or down, and the weight defaults to
    /// 1. Without `allow_duplicate`, an existing vote for the key is updated
    /// in place; if it already has the requested flag and weight nothing is
    /// written. The votable's cached summary is recomputed in the same
    /// transaction.
    ///
    /// # Returns
    ///
    /// * `Ok(outcome)` - `outcome.registered` is `false` when either side did not
    ///   resolve, the cast was a no-op, or the store failed and the transaction
    ///   was rolled back
    /// * `Err(BallotError::LocatorNotConfigured)` - A locator reference was given
    ///   without a locator
    pub async fn cast_vote(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        ballot: &CastBallot,
    ) -> Result<CastOutcome, BallotError> {
        let Some((voter, votable)) = self.resolve_pair(voter, votable).await? else {
            return Ok(CastOutcome::unchanged());
        };
        let flag = self.words.is_up(&ballot.vote);
        let weight = Weight::coerce(ballot.weight);

        match self.apply_cast(&voter, &votable, ballot, flag, weight).await {
            Ok(Some(vote)) => {
                debug!(voter = %voter, votable = %votable, scope = %ballot.scope, flag, "Vote registered");
                Ok(CastOutcome::registered(vote))
            }
            Ok(None) => {
                debug!(voter = %voter, votable = %votable, scope = %ballot.scope, "Vote unchanged");
                Ok(CastOutcome::unchanged())
            }
            Err(e) => {
                warn!(voter = %voter, votable = %votable, error = %e, "Cast rolled back");
                Ok(CastOutcome::unchanged())
            }
        }
    }

    async fn apply_cast(
        &self,
        voter: &EntityKey,
        votable: &EntityKey,
        ballot: &CastBallot,
        flag: bool,
        weight: Weight,
    ) -> Result<Option<Vote>, VoteStoreError> {
        let mut tx = self.store.begin().await?;
        let written = upsert_vote(
            &mut *tx,
            voter,
            votable,
            &ballot.scope,
            flag,
            weight,
            ballot.allow_duplicate,
        )
        .await?;

        let Some(vote) = written else {
            tx.rollback().await?;
            return Ok(None);
        };
        self.summaries
            .recompute(&mut *tx, votable, &ballot.scope)
            .await?;
        tx.commit().await?;
        Ok(Some(vote))
    }

    pub async fn cast_up(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        scope: impl Into<Scope>,
    ) -> Result<CastOutcome, BallotError> {
        self.cast_vote(voter, votable, &CastBallot::up().scope(scope))
            .await
    }

    pub async fn cast_down(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        scope: impl Into<Scope>,
    ) -> Result<CastOutcome, BallotError> {
        self.cast_vote(voter, votable, &CastBallot::down().scope(scope))
            .await
    }

    /// Removes every vote by `voter` on `votable` in `scope`.
    ///
    /// Returns `Ok(true)` if the key holds no votes afterwards, including when
    /// it held none to begin with. Returns `Ok(false)` if either side did not
    /// resolve or the store failed.
    pub async fn remove_votes(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        scope: &Scope,
    ) -> Result<bool, BallotError> {
        let Some((voter, votable)) = self.resolve_pair(voter, votable).await? else {
            return Ok(false);
        };

        match self.apply_remove(&voter, &votable, scope).await {
            Ok(removed) => {
                debug!(voter = %voter, votable = %votable, scope = %scope, removed, "Votes removed");
                Ok(true)
            }
            Err(e) => {
                warn!(voter = %voter, votable = %votable, error = %e, "Removal rolled back");
                Ok(false)
            }
        }
    }

    async fn apply_remove(
        &self,
        voter: &EntityKey,
        votable: &EntityKey,
        scope: &Scope,
    ) -> Result<u64, VoteStoreError> {
        let mut tx = self.store.begin().await?;
        let removed = tx.delete_votes(&key_filter(voter, votable, scope)).await?;
        if removed == 0 {
            tx.rollback().await?;
            return Ok(0);
        }
        self.summaries.recompute(&mut *tx, votable, scope).await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// Returns `true` if `voter` has a vote on `votable` matching `query`.
    pub async fn has_vote(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        query: &VoteQuery,
    ) -> Result<bool, BallotError> {
        let Some((voter, votable)) = self.resolve_pair(voter, votable).await? else {
            return Ok(false);
        };
        let filter = VoteFilter::new().voter(&voter).votable(&votable).query(query);
        Ok(self.store.vote_exists(&filter).await?)
    }

    pub async fn has_up_vote(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        scope: &Scope,
    ) -> Result<bool, BallotError> {
        self.has_vote(voter, votable, &VoteQuery::scoped(scope.clone()).up())
            .await
    }

    pub async fn has_down_vote(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        scope: &Scope,
    ) -> Result<bool, BallotError> {
        self.has_vote(voter, votable, &VoteQuery::scoped(scope.clone()).down())
            .await
    }

    /// Flag of the most recently updated vote by `voter` on `votable`
    /// matching `query`, or `None` if there is none.
    pub async fn last_cast_flag(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        query: &VoteQuery,
    ) -> Result<Option<bool>, BallotError> {
        let Some((voter, votable)) = self.resolve_pair(voter, votable).await? else {
            return Ok(None);
        };
        let filter = VoteFilter::new()
            .voter(&voter)
            .votable(&votable)
            .query(query)
            .limit(1);
        let latest = self.store.find_votes(&filter, VoteOrder::Latest).await?;
        Ok(latest.first().map(|vote| vote.flag))
    }

    async fn list(&self, filter: VoteFilter) -> Result<Vec<Vote>, BallotError> {
        Ok(self.store.find_votes(&filter, VoteOrder::Insertion).await?)
    }

    /// Votes cast by `voter`, in insertion order.
    pub async fn votes_by_voter(
        &self,
        voter: &EntityRef,
        query: &VoteQuery,
    ) -> Result<Vec<Vote>, BallotError> {
        match self.resolver.resolve_voter(voter).await? {
            Some(voter) => self.list(VoteFilter::new().voter(&voter).query(query)).await,
            None => Ok(Vec::new()),
        }
    }

    /// Votes cast on `votable`, in insertion order.
    pub async fn votes_for_votable(
        &self,
        votable: &EntityRef,
        query: &VoteQuery,
    ) -> Result<Vec<Vote>, BallotError> {
        match self.resolver.resolve_votable(votable).await? {
            Some(votable) => {
                self.list(VoteFilter::new().votable(&votable).query(query))
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Votes on any votable of `votable_type`, matched on its canonical name.
    pub async fn votes_for_type(
        &self,
        votable_type: &str,
        query: &VoteQuery,
    ) -> Result<Vec<Vote>, BallotError> {
        let canonical = self.resolver.registry().canonical_name(votable_type);
        self.list(VoteFilter::new().votable_type(canonical).query(query))
            .await
    }

    /// Votes cast by any voter of `voter_type`, matched on its canonical name.
    pub async fn votes_by_type(
        &self,
        voter_type: &str,
        query: &VoteQuery,
    ) -> Result<Vec<Vote>, BallotError> {
        let canonical = self.resolver.registry().canonical_name(voter_type);
        self.list(VoteFilter::new().voter_type(canonical).query(query))
            .await
    }

    /// Votes by `voter` on votables of `votable_type`.
    pub async fn voter_votes_for_type(
        &self,
        voter: &EntityRef,
        votable_type: &str,
        query: &VoteQuery,
    ) -> Result<Vec<Vote>, BallotError> {
        let Some(voter) = self.resolver.resolve_voter(voter).await? else {
            return Ok(Vec::new());
        };
        let canonical = self.resolver.registry().canonical_name(votable_type);
        self.list(
            VoteFilter::new()
                .voter(&voter)
                .votable_type(canonical)
                .query(query),
        )
        .await
    }

    /// Votes on `votable` by voters of `voter_type`.
    pub async fn votable_votes_by_type(
        &self,
        votable: &EntityRef,
        voter_type: &str,
        query: &VoteQuery,
    ) -> Result<Vec<Vote>, BallotError> {
        let Some(votable) = self.resolver.resolve_votable(votable).await? else {
            return Ok(Vec::new());
        };
        let canonical = self.resolver.registry().canonical_name(voter_type);
        self.list(
            VoteFilter::new()
                .votable(&votable)
                .voter_type(canonical)
                .query(query),
        )
        .await
    }
}
