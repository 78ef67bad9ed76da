//! Batch reconciliation of one voter's votes across many votables.
use std::collections::BTreeSet;
use std::sync::Arc;

use ballot_repository::{VoteStore, VoteStoreError};
use ballot_shared::types::{
    BatchBallot, BatchOutcome, EntityKey, Scope, VotableSet, VoteFilter, Weight,
};
use tracing::{info, warn};

use crate::errors::BallotError;
use crate::ledger::upsert_vote;
use crate::resolver::{EntityRef, IdentityResolver};
use crate::summary::SummaryCache;

/// A batch with every reference resolved and validated.
struct BatchPlan {
    voter: EntityKey,
    up: Vec<EntityKey>,
    down: Vec<EntityKey>,
    remove: Vec<EntityKey>,
    scope: Scope,
    weight: Weight,
}

impl BatchPlan {
    /// Every votable named in the batch, each once, in key order.
    fn touched(&self) -> BTreeSet<&EntityKey> {
        self.remove
            .iter()
            .chain(&self.down)
            .chain(&self.up)
            .collect()
    }
}

/// Flattens a votable set into references, in the order given.
fn references(set: &VotableSet, label: &str) -> Result<Vec<EntityRef>, BallotError> {
    match set {
        VotableSet::Entities(handles) => Ok(handles.iter().map(EntityRef::from).collect()),
        VotableSet::Pairs(pairs) => pairs
            .iter()
            .map(|pair| {
                let mut entries = pair.iter();
                match (entries.next(), entries.next()) {
                    (Some((type_name, id)), None) => Ok(EntityRef::typed(type_name, *id)),
                    _ => Err(BallotError::validation(format!(
                        "each {label} entry must name exactly one type and id"
                    ))),
                }
            })
            .collect(),
        VotableSet::ByType(by_type) => {
            if let Some(type_name) = by_type
                .iter()
                .find_map(|(type_name, ids)| ids.is_empty().then_some(type_name))
            {
                return Err(BallotError::validation(format!(
                    "{label} entry {type_name} lists no ids"
                )));
            }
            Ok(by_type
                .iter()
                .flat_map(|(type_name, ids)| {
                    ids.iter().map(move |id| EntityRef::typed(type_name, *id))
                })
                .collect())
        }
        VotableSet::Located(located) => Ok(located
            .iter()
            .map(|(token, params)| EntityRef::Located {
                token: token.clone(),
                params: params.clone(),
            })
            .collect()),
    }
}

pub struct BatchReconciler {
    store: Arc<dyn VoteStore>,
    resolver: Arc<IdentityResolver>,
    summaries: Arc<SummaryCache>,
}

impl BatchReconciler {
    pub fn new(
        store: Arc<dyn VoteStore>,
        resolver: Arc<IdentityResolver>,
        summaries: Arc<SummaryCache>,
    ) -> Self {
        Self {
            store,
            resolver,
            summaries,
        }
    }

    /// Applies `batch` for `voter` in a single transaction.
    ///
    /// Removes first, then casts down votes, then up votes, and finally
    /// recomputes the cached summary of every caching votable in the batch.
    /// Counts only rows actually deleted, inserted or changed.
    ///
    /// # Returns
    ///
    /// * `Ok(outcome)` - `outcome.success` is `false` with an `error` when the
    ///   batch failed validation or the transaction was rolled back; nothing is
    ///   written in either case
    /// * `Err(BallotError::LocatorNotConfigured)` - A locator reference was given
    ///   without a locator
    pub async fn reconcile(
        &self,
        voter: &EntityRef,
        batch: &BatchBallot,
    ) -> Result<BatchOutcome, BallotError> {
        let plan = match self.plan(voter, batch).await {
            Ok(plan) => plan,
            Err(BallotError::LocatorNotConfigured) => {
                return Err(BallotError::LocatorNotConfigured);
            }
            Err(e) => {
                warn!(error = %e, "Batch rejected");
                return Ok(BatchOutcome::failed(e.to_string()));
            }
        };

        match self.apply(&plan).await {
            Ok((up, down, remove)) => {
                info!(voter = %plan.voter, scope = %plan.scope, up, down, remove, "Batch committed");
                Ok(BatchOutcome::succeeded(up, down, remove))
            }
            Err(e) => {
                warn!(voter = %plan.voter, error = %e, "Batch rolled back");
                Ok(BatchOutcome::failed(e.to_string()))
            }
        }
    }

    async fn plan(&self, voter: &EntityRef, batch: &BatchBallot) -> Result<BatchPlan, BallotError> {
        let weight = Weight::new(batch.weight).ok_or_else(|| {
            BallotError::validation(format!(
                "weight must be a positive integer, got {}",
                batch.weight
            ))
        })?;
        let voter = self
            .resolver
            .resolve_voter(voter)
            .await?
            .ok_or_else(|| BallotError::validation("voter could not be resolved"))?;

        let up = self.resolve_set(&batch.up, "up").await?;
        let down = self.resolve_set(&batch.down, "down").await?;
        let remove = self.resolve_set(&batch.remove, "remove").await?;

        for key in &up {
            if down.contains(key) || remove.contains(key) {
                return Err(overlap(key));
            }
        }
        if let Some(key) = down.iter().find(|key| remove.contains(key)) {
            return Err(overlap(key));
        }

        Ok(BatchPlan {
            voter,
            up,
            down,
            remove,
            scope: batch.scope.clone(),
            weight,
        })
    }

    /// Resolves a set to votable keys, collapsing repeats.
    ///
    /// Keys come back sorted so concurrent batches lock rows in one order.
    async fn resolve_set(
        &self,
        set: &VotableSet,
        label: &str,
    ) -> Result<Vec<EntityKey>, BallotError> {
        let mut keys = Vec::with_capacity(set.len());
        for reference in references(set, label)? {
            let key = self
                .resolver
                .resolve_votable(&reference)
                .await?
                .ok_or_else(|| {
                    BallotError::validation(format!(
                        "{label} votable {reference:?} could not be resolved"
                    ))
                })?;
            keys.push(key);
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn apply(&self, plan: &BatchPlan) -> Result<(u64, u64, u64), VoteStoreError> {
        let mut tx = self.store.begin().await?;

        let removed = if plan.remove.is_empty() {
            0
        } else {
            let filter = VoteFilter::new()
                .voter(&plan.voter)
                .votables(plan.remove.clone())
                .scope(plan.scope.clone());
            tx.delete_votes(&filter).await?
        };

        let mut down = 0;
        for votable in &plan.down {
            let written = upsert_vote(
                &mut *tx,
                &plan.voter,
                votable,
                &plan.scope,
                false,
                plan.weight,
                false,
            )
            .await?;
            down += u64::from(written.is_some());
        }

        let mut up = 0;
        for votable in &plan.up {
            let written = upsert_vote(
                &mut *tx,
                &plan.voter,
                votable,
                &plan.scope,
                true,
                plan.weight,
                false,
            )
            .await?;
            up += u64::from(written.is_some());
        }

        for votable in plan.touched() {
            self.summaries
                .recompute(&mut *tx, votable, &plan.scope)
                .await?;
        }

        tx.commit().await?;
        Ok((up, down, removed))
    }
}

fn overlap(key: &EntityKey) -> BallotError {
    BallotError::validation(format!(
        "{key} appears in more than one of up, down and remove"
    ))
}
