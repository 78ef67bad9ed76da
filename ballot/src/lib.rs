//! # Ballot
//!
//! Polymorphic, scoped vote recording. Any registered voter entity can cast a
//! weighted up or down vote on any registered votable entity, optionally
//! within a named scope, with cached per-scope summaries kept on the votable.
//!
//! ## Architecture
//!
//! 1. **Registry**: startup-time registration of entity types and capabilities
//! 2. **Resolver**: turns caller references into canonical entity keys
//! 3. **Ledger**: casts, removes and queries individual votes
//! 4. **Summary cache**: recomputes cached summaries inside each mutation
//! 5. **Reconciler**: applies up/down/remove batches in one transaction
//! 6. **Eager loader**: fetches the entities behind a list of votes
//!
//! Storage is abstracted by [`ballot_repository::VoteStore`].
//!
//! ## Modules
//!
//! - [`config`]: Configuration read from the environment
//! - [`errors`]: Error types for the engine
//! - [`words`]: Vote word interpretation

pub mod config;
pub mod eager;
pub mod errors;
pub mod ledger;
pub mod reconciler;
pub mod registry;
pub mod resolver;
pub mod summary;
pub mod words;

use std::sync::Arc;

use ballot_repository::VoteStore;
use ballot_shared::types::{BatchBallot, BatchOutcome, CastOutcome, Scope, ScopeSummary};

pub use config::{BallotConfig, LogFormat};
pub use eager::EagerLoader;
pub use errors::BallotError;
pub use ledger::{CastBallot, VoteLedger};
pub use reconciler::BatchReconciler;
pub use registry::{Capabilities, EntityRegistry, EntityType};
pub use resolver::{EntityDirectory, EntityRef, IdentityResolver, Locator};
pub use summary::{SummaryCache, SummaryRead};
pub use words::{VoteWord, VoteWords};

/// The assembled voting engine.
///
/// Components share the store, registry and resolver through `Arc`s, so a
/// `Ballot` can be wrapped in an `Arc` itself and used from many tasks.
pub struct Ballot {
    resolver: Arc<IdentityResolver>,
    ledger: VoteLedger,
    summaries: Arc<SummaryCache>,
    reconciler: BatchReconciler,
    eager: EagerLoader,
}

impl Ballot {
    pub fn builder(
        store: Arc<dyn VoteStore>,
        directory: Arc<dyn EntityDirectory>,
    ) -> BallotBuilder {
        BallotBuilder {
            store,
            directory,
            registry: EntityRegistry::default(),
            locator: None,
            words: VoteWords::default(),
        }
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    pub fn summaries(&self) -> &SummaryCache {
        &self.summaries
    }

    pub fn reconciler(&self) -> &BatchReconciler {
        &self.reconciler
    }

    pub fn eager(&self) -> &EagerLoader {
        &self.eager
    }

    /// See [`VoteLedger::cast_vote`].
    pub async fn cast_vote(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        ballot: &CastBallot,
    ) -> Result<CastOutcome, BallotError> {
        self.ledger.cast_vote(voter, votable, ballot).await
    }

    /// See [`VoteLedger::remove_votes`].
    pub async fn remove_votes(
        &self,
        voter: &EntityRef,
        votable: &EntityRef,
        scope: &Scope,
    ) -> Result<bool, BallotError> {
        self.ledger.remove_votes(voter, votable, scope).await
    }

    /// See [`BatchReconciler::reconcile`].
    pub async fn reconcile(
        &self,
        voter: &EntityRef,
        batch: &BatchBallot,
    ) -> Result<BatchOutcome, BallotError> {
        self.reconciler.reconcile(voter, batch).await
    }

    /// See [`SummaryCache::summary`].
    pub async fn summary(
        &self,
        votable: &EntityRef,
        scope: &Scope,
        read: SummaryRead,
    ) -> Result<ScopeSummary, BallotError> {
        self.summaries.summary(votable, scope, read).await
    }
}

pub struct BallotBuilder {
    store: Arc<dyn VoteStore>,
    directory: Arc<dyn EntityDirectory>,
    registry: EntityRegistry,
    locator: Option<Arc<dyn Locator>>,
    words: VoteWords,
}

impl BallotBuilder {
    pub fn registry(mut self, registry: EntityRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn locator(mut self, locator: Arc<dyn Locator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn words(mut self, words: VoteWords) -> Self {
        self.words = words;
        self
    }

    pub fn build(self) -> Ballot {
        let resolver = Arc::new(IdentityResolver::new(
            Arc::new(self.registry),
            self.directory,
            self.locator,
        ));
        let summaries = Arc::new(SummaryCache::new(self.store.clone(), resolver.clone()));
        let ledger = VoteLedger::new(
            self.store.clone(),
            resolver.clone(),
            summaries.clone(),
            Arc::new(self.words),
        );
        let reconciler =
            BatchReconciler::new(self.store.clone(), resolver.clone(), summaries.clone());
        let eager = EagerLoader::new(self.store, resolver.clone());

        Ballot {
            resolver,
            ledger,
            summaries,
            reconciler,
            eager,
        }
    }
}
