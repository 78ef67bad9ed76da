use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a voter or votable in the host store.
pub type EntityId = i64;

/// A live entity as handed over by the host application.
///
/// `type_name` is the concrete type of the entity, which may be a subtype in a
/// single-table-inheritance hierarchy. It is canonicalized to the hierarchy
/// root before it is ever written to a vote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    pub id: EntityId,
    pub type_name: String,
}

impl EntityHandle {
    pub fn new(type_name: impl Into<String>, id: EntityId) -> Self {
        Self {
            id,
            type_name: type_name.into(),
        }
    }
}

/// A resolved polymorphic reference: the id and the canonical type name.
///
/// This is the pair stored in the `votable_*` and `voter_*` columns of a vote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub id: EntityId,
    pub type_name: String,
}

impl EntityKey {
    pub fn new(type_name: impl Into<String>, id: EntityId) -> Self {
        Self {
            id,
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}
