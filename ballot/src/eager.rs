//! Loading the entities on the other end of a set of votes.
//!
//! Votes can point at several entity types. Rather than one lookup per vote,
//! ids are grouped by type, fetched with one `find_many` per type and stitched
//! back in vote order.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ballot_repository::VoteStore;
use ballot_shared::types::{EntityHandle, EntityId, EntityKey, VoteFilter, VoteOrder, VoteQuery};

use crate::errors::BallotError;
use crate::resolver::{EntityRef, IdentityResolver};

pub struct EagerLoader {
    store: Arc<dyn VoteStore>,
    resolver: Arc<IdentityResolver>,
}

impl EagerLoader {
    pub fn new(store: Arc<dyn VoteStore>, resolver: Arc<IdentityResolver>) -> Self {
        Self { store, resolver }
    }

    /// Entities `voter` has voted on, one per matching vote, in insertion
    /// order. Votes whose votable no longer exists are skipped.
    pub async fn votables_for_voter(
        &self,
        voter: &EntityRef,
        query: &VoteQuery,
    ) -> Result<Vec<EntityHandle>, BallotError> {
        let Some(voter) = self.resolver.resolve_voter(voter).await? else {
            return Ok(Vec::new());
        };
        let filter = VoteFilter::new().voter(&voter).query(query);
        let votes = self.store.find_votes(&filter, VoteOrder::Insertion).await?;
        let keys: Vec<EntityKey> = votes.into_iter().map(|vote| vote.votable).collect();
        self.load(&keys).await
    }

    /// Entities that voted on `votable`, one per matching vote, in insertion
    /// order. Votes whose voter no longer exists are skipped.
    pub async fn voters_for_votable(
        &self,
        votable: &EntityRef,
        query: &VoteQuery,
    ) -> Result<Vec<EntityHandle>, BallotError> {
        let Some(votable) = self.resolver.resolve_votable(votable).await? else {
            return Ok(Vec::new());
        };
        let filter = VoteFilter::new().votable(&votable).query(query);
        let votes = self.store.find_votes(&filter, VoteOrder::Insertion).await?;
        let keys: Vec<EntityKey> = votes.into_iter().map(|vote| vote.voter).collect();
        self.load(&keys).await
    }

    /// Fetches the entities behind `keys` with one directory call per type.
    pub async fn load(&self, keys: &[EntityKey]) -> Result<Vec<EntityHandle>, BallotError> {
        let mut ids_by_type: BTreeMap<&str, Vec<EntityId>> = BTreeMap::new();
        for key in keys {
            let ids = ids_by_type.entry(key.type_name.as_str()).or_default();
            if !ids.contains(&key.id) {
                ids.push(key.id);
            }
        }

        let directory = self.resolver.directory();
        let mut found: HashMap<(&str, EntityId), EntityHandle> = HashMap::new();
        for (type_name, ids) in &ids_by_type {
            for handle in directory.find_many(type_name, ids).await? {
                found.insert((*type_name, handle.id), handle);
            }
        }

        Ok(keys
            .iter()
            .filter_map(|key| found.get(&(key.type_name.as_str(), key.id)).cloned())
            .collect())
    }
}
