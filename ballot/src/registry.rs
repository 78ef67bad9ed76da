//! Startup-time registration of the entity types taking part in voting.
//!
//! The registry is built once and shared behind an `Arc`. It answers three
//! questions for the rest of the engine: which types may vote or be voted on,
//! what canonical name a type is stored under, and where a type keeps its
//! cached summary.
use std::collections::{HashMap, HashSet};

use ballot_shared::types::{EntityHandle, EntityKey, SummaryLocation};

/// Class-level capabilities of an entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub votable: bool,
    pub voter: bool,
}

/// Registration record for one concrete entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    pub name: String,
    /// Parent type sharing this type's storage, for single-table inheritance.
    pub root: Option<String>,
    pub capabilities: Capabilities,
    pub summary: Option<SummaryLocation>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: None,
            capabilities: Capabilities::default(),
            summary: None,
        }
    }

    /// Declares `root` as the type this one inherits its storage from.
    pub fn inherits(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn votable(mut self) -> Self {
        self.capabilities.votable = true;
        self
    }

    pub fn voter(mut self) -> Self {
        self.capabilities.voter = true;
        self
    }

    /// Opts the type in to summary caching at `location`.
    pub fn caches_summary(mut self, location: SummaryLocation) -> Self {
        self.summary = Some(location);
        self
    }
}

#[derive(Debug, Default)]
pub struct EntityRegistryBuilder {
    types: HashMap<String, EntityType>,
}

impl EntityRegistryBuilder {
    /// Adds a type. Registering the same name twice keeps the later record.
    pub fn register(mut self, entity_type: EntityType) -> Self {
        self.types.insert(entity_type.name.clone(), entity_type);
        self
    }

    pub fn build(self) -> EntityRegistry {
        EntityRegistry { types: self.types }
    }
}

/// Immutable map from type name to its registration.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    types: HashMap<String, EntityType>,
}

impl EntityRegistry {
    pub fn builder() -> EntityRegistryBuilder {
        EntityRegistryBuilder::default()
    }

    pub fn get(&self, type_name: &str) -> Option<&EntityType> {
        self.types.get(type_name)
    }

    /// Class-level capabilities of `type_name`. Unregistered types have none.
    pub fn capabilities(&self, type_name: &str) -> Capabilities {
        self.get(type_name)
            .map(|entity_type| entity_type.capabilities)
            .unwrap_or_default()
    }

    /// Returns the name votes on `type_name` are stored under.
    ///
    /// Follows declared roots until reaching a type without one (or one that
    /// is not registered). Unknown names are returned unchanged, and a cycle
    /// of declarations stops at the first repeated name.
    pub fn canonical_name(&self, type_name: &str) -> String {
        let mut current = type_name;
        let mut seen = HashSet::new();

        while seen.insert(current) {
            match self.get(current).and_then(|t| t.root.as_deref()) {
                Some(root) => current = root,
                None => break,
            }
        }
        current.to_string()
    }

    /// Canonical key for a concrete entity handle.
    pub fn key(&self, handle: &EntityHandle) -> EntityKey {
        EntityKey::new(self.canonical_name(&handle.type_name), handle.id)
    }

    /// Where votables of `type_name` cache their summary, if they do.
    ///
    /// Summaries are keyed by canonical votable, so only the root type's
    /// registration counts.
    pub fn summary_location(&self, type_name: &str) -> Option<&SummaryLocation> {
        let canonical = self.canonical_name(type_name);
        self.get(&canonical).and_then(|t| t.summary.as_ref())
    }
}
