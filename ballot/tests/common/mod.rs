//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ballot::{
    Ballot, BallotError, Capabilities, EntityDirectory, EntityRef, EntityRegistry, EntityType,
    Locator,
};
use ballot_repository::InMemoryVoteStore;
use ballot_shared::types::{EntityHandle, EntityId, LocatorParams, SummaryLocation};

/// Entity lookup over a fixed set of entities.
///
/// Subtype instances are reachable under their own type name and under every
/// ancestor's, the way a single-table-inheritance lookup behaves.
pub struct FixtureDirectory {
    entities: HashMap<(String, EntityId), EntityHandle>,
    disabled: Mutex<HashSet<EntityHandle>>,
    find_many_calls: AtomicUsize,
}

impl FixtureDirectory {
    pub fn new() -> Self {
        let mut directory = Self {
            entities: HashMap::new(),
            disabled: Mutex::new(HashSet::new()),
            find_many_calls: AtomicUsize::new(0),
        };
        for id in 1..=10 {
            directory.insert("User", id, &[]);
        }
        directory.insert("Admin", 40, &["User"]);
        directory.insert("Post", 10, &[]);
        directory.insert("Post", 11, &[]);
        directory.insert("Article", 12, &["Post"]);
        directory.insert("Comment", 20, &[]);
        directory.insert("Comment", 21, &[]);
        directory.insert("Draft", 30, &[]);
        directory
    }

    fn insert(&mut self, type_name: &str, id: EntityId, ancestors: &[&str]) {
        let handle = EntityHandle::new(type_name, id);
        self.entities
            .insert((type_name.to_string(), id), handle.clone());
        for ancestor in ancestors {
            self.entities
                .insert((ancestor.to_string(), id), handle.clone());
        }
    }

    /// Turns off every capability of one instance.
    pub fn disable(&self, handle: EntityHandle) {
        self.disabled.lock().unwrap().insert(handle);
    }

    pub fn find_many_calls(&self) -> usize {
        self.find_many_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityDirectory for FixtureDirectory {
    async fn find(
        &self,
        type_name: &str,
        id: EntityId,
    ) -> Result<Option<EntityHandle>, BallotError> {
        Ok(self.entities.get(&(type_name.to_string(), id)).cloned())
    }

    async fn find_many(
        &self,
        type_name: &str,
        ids: &[EntityId],
    ) -> Result<Vec<EntityHandle>, BallotError> {
        self.find_many_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ids
            .iter()
            .filter_map(|id| self.entities.get(&(type_name.to_string(), *id)).cloned())
            .collect())
    }

    fn capabilities(&self, handle: &EntityHandle, class_level: Capabilities) -> Capabilities {
        if self.disabled.lock().unwrap().contains(handle) {
            Capabilities::default()
        } else {
            class_level
        }
    }
}

/// Resolves `gid://app/<Type>/<id>` tokens against the fixture directory.
pub struct GlobalIdLocator {
    directory: Arc<FixtureDirectory>,
}

#[async_trait]
impl Locator for GlobalIdLocator {
    async fn locate(
        &self,
        token: &str,
        _params: &LocatorParams,
    ) -> Result<Option<EntityHandle>, BallotError> {
        let Some(path) = token.strip_prefix("gid://app/") else {
            return Err(BallotError::directory(format!("malformed token {token}")));
        };
        let Some((type_name, id)) = path.split_once('/') else {
            return Ok(None);
        };
        let Ok(id) = id.parse() else {
            return Ok(None);
        };
        self.directory.find(type_name, id).await
    }
}

pub fn registry() -> EntityRegistry {
    EntityRegistry::builder()
        .register(EntityType::new("User").voter())
        .register(EntityType::new("Admin").inherits("User").voter().votable())
        .register(
            EntityType::new("Post")
                .votable()
                .caches_summary(SummaryLocation::new("posts")),
        )
        .register(EntityType::new("Article").inherits("Post").votable())
        .register(EntityType::new("Comment").votable())
        .register(EntityType::new("Draft"))
        .build()
}

pub struct Fixture {
    pub store: Arc<InMemoryVoteStore>,
    pub directory: Arc<FixtureDirectory>,
    pub ballot: Ballot,
}

pub fn fixture() -> Fixture {
    build_fixture(false)
}

pub fn fixture_with_locator() -> Fixture {
    build_fixture(true)
}

fn build_fixture(with_locator: bool) -> Fixture {
    let store = Arc::new(InMemoryVoteStore::new());
    let directory = Arc::new(FixtureDirectory::new());
    let mut builder = Ballot::builder(store.clone(), directory.clone()).registry(registry());
    if with_locator {
        builder = builder.locator(Arc::new(GlobalIdLocator {
            directory: directory.clone(),
        }));
    }
    Fixture {
        store,
        directory,
        ballot: builder.build(),
    }
}

pub fn user(id: EntityId) -> EntityRef {
    EntityRef::typed("User", id)
}

pub fn post(id: EntityId) -> EntityRef {
    EntityRef::typed("Post", id)
}

pub fn comment(id: EntityId) -> EntityRef {
    EntityRef::typed("Comment", id)
}
