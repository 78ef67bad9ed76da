//! Cached per-scope vote summaries.
//!
//! Votables whose type registers a [`SummaryLocation`] keep a JSON map from
//! scope key to [`ScopeSummary`] on their own row. The map is rewritten for
//! the affected scope inside the transaction of every mutation, under a row
//! lock on the votable. Types without a location are always read live.
use std::sync::Arc;

use ballot_repository::{VoteStore, VoteStoreError, VoteTransaction};
use ballot_shared::types::{
    EntityKey, Scope, ScopeSummary, SummaryLocation, VoteFilter, VoteSummary,
};
use tracing::debug;

use crate::errors::BallotError;
use crate::resolver::{EntityRef, IdentityResolver};

/// Where a summary read is served from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryRead {
    /// The cached map when the type caches, live aggregation otherwise.
    #[default]
    Cached,
    /// Always aggregate from the vote rows, leaving the cache untouched.
    Live,
}

pub struct SummaryCache {
    store: Arc<dyn VoteStore>,
    resolver: Arc<IdentityResolver>,
}

impl SummaryCache {
    pub fn new(store: Arc<dyn VoteStore>, resolver: Arc<IdentityResolver>) -> Self {
        Self { store, resolver }
    }

    fn location(&self, votable: &EntityKey) -> Option<&SummaryLocation> {
        self.resolver
            .registry()
            .summary_location(&votable.type_name)
    }

    /// Returns `true` if votables of this key's type cache their summary.
    pub fn caches(&self, votable: &EntityKey) -> bool {
        self.location(votable).is_some()
    }

    /// Recomputes the `scope` entry of `votable`'s cached summary inside `tx`.
    ///
    /// Locks the votable row, aggregates the scope from scratch within the
    /// transaction, merges the entry over the existing map and writes the map
    /// back. Entries for other scopes are left as they were.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The summary was rewritten
    /// * `Ok(false)` - The type does not cache, or the votable row does not exist
    pub async fn recompute(
        &self,
        tx: &mut dyn VoteTransaction,
        votable: &EntityKey,
        scope: &Scope,
    ) -> Result<bool, VoteStoreError> {
        let Some(location) = self.location(votable) else {
            return Ok(false);
        };
        let Some(mut summary) = tx.lock_summary(location, votable.id).await? else {
            debug!(votable = %votable, "Votable row missing, summary not cached");
            return Ok(false);
        };

        let filter = VoteFilter::new().votable(votable).scope(scope.clone());
        let tally = tx.tally(&filter).await?;
        summary.merge(scope, ScopeSummary::from(tally));
        tx.write_summary(location, votable.id, &summary).await?;

        debug!(votable = %votable, scope = %scope, "Summary recomputed");
        Ok(true)
    }

    /// Aggregates `scope` for `votable` directly from the vote rows.
    pub async fn live_summary(
        &self,
        votable: &EntityKey,
        scope: &Scope,
    ) -> Result<ScopeSummary, BallotError> {
        let filter = VoteFilter::new().votable(votable).scope(scope.clone());
        Ok(self.store.tally(&filter).await?.into())
    }

    /// Summary of `scope` for an already resolved votable.
    pub async fn summary_for(
        &self,
        votable: &EntityKey,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<ScopeSummary, BallotError> {
        match (read, self.location(votable)) {
            (SummaryRead::Cached, Some(location)) => Ok(self
                .store
                .read_summary(location, votable.id)
                .await?
                .map(|cached| cached.get(scope))
                .unwrap_or_default()),
            _ => self.live_summary(votable, scope).await,
        }
    }

    /// Summary of `scope` for `votable`.
    ///
    /// An unresolvable votable, or a cached map without an entry for the
    /// scope, reads as all zeroes.
    pub async fn summary(
        &self,
        votable: &EntityRef,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<ScopeSummary, BallotError> {
        match self.resolver.resolve_votable(votable).await? {
            Some(key) => self.summary_for(&key, scope, read).await,
            None => Ok(ScopeSummary::default()),
        }
    }

    /// The whole cached map for `votable`, or `None` if it does not cache or
    /// does not resolve.
    pub async fn cached_summary(
        &self,
        votable: &EntityRef,
    ) -> Result<Option<VoteSummary>, BallotError> {
        let Some(key) = self.resolver.resolve_votable(votable).await? else {
            return Ok(None);
        };
        match self.location(&key) {
            Some(location) => Ok(self.store.read_summary(location, key.id).await?),
            None => Ok(None),
        }
    }

    pub async fn total_votes(
        &self,
        votable: &EntityRef,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<i64, BallotError> {
        Ok(self.summary(votable, scope, read).await?.total)
    }

    pub async fn up_votes(
        &self,
        votable: &EntityRef,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<i64, BallotError> {
        Ok(self.summary(votable, scope, read).await?.up)
    }

    pub async fn down_votes(
        &self,
        votable: &EntityRef,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<i64, BallotError> {
        Ok(self.summary(votable, scope, read).await?.down)
    }

    pub async fn score(
        &self,
        votable: &EntityRef,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<i64, BallotError> {
        Ok(self.summary(votable, scope, read).await?.score)
    }

    pub async fn weighted_total(
        &self,
        votable: &EntityRef,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<i64, BallotError> {
        Ok(self.summary(votable, scope, read).await?.weighted_total)
    }

    pub async fn weighted_score(
        &self,
        votable: &EntityRef,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<i64, BallotError> {
        Ok(self.summary(votable, scope, read).await?.weighted_score)
    }

    /// Weighted score divided by the number of votes; `0.0` with no votes.
    pub async fn weighted_average(
        &self,
        votable: &EntityRef,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<f64, BallotError> {
        Ok(self.summary(votable, scope, read).await?.weighted_average())
    }
}
