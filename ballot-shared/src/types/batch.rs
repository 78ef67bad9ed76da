use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{EntityHandle, EntityId, Scope, Vote};

/// Parameters forwarded to an external locator alongside its token.
pub type LocatorParams = BTreeMap<String, String>;

/// A set of votables named in one of the batch collections.
///
/// Accepts the four shapes callers use to describe votables; all of them are
/// normalized to resolved keys before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VotableSet {
    /// `[{"id": 1, "type_name": "Post"}]`
    Entities(Vec<EntityHandle>),
    /// `[{"Post": 1}, {"Post": 2}]`; each map must hold exactly one entry.
    Pairs(Vec<BTreeMap<String, EntityId>>),
    /// `{"Post": [1, 2]}`
    ByType(BTreeMap<String, Vec<EntityId>>),
    /// `{"gid://app/Post/1": {"expires_in": "3600"}}`
    Located(BTreeMap<String, LocatorParams>),
}

impl Default for VotableSet {
    fn default() -> Self {
        Self::Entities(Vec::new())
    }
}

impl VotableSet {
    pub fn len(&self) -> usize {
        match self {
            Self::Entities(entities) => entities.len(),
            Self::Pairs(pairs) => pairs.len(),
            Self::ByType(by_type) => by_type.values().map(Vec::len).sum(),
            Self::Located(located) => located.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn default_weight() -> i64 {
    1
}

/// One batch of up, down and remove operations by a single voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchBallot {
    #[serde(default)]
    pub up: VotableSet,
    #[serde(default)]
    pub down: VotableSet,
    #[serde(default)]
    pub remove: VotableSet,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default = "default_weight")]
    pub weight: i64,
}

impl Default for BatchBallot {
    fn default() -> Self {
        Self {
            up: VotableSet::default(),
            down: VotableSet::default(),
            remove: VotableSet::default(),
            scope: Scope::unscoped(),
            weight: default_weight(),
        }
    }
}

/// Result of a batch reconciliation.
///
/// On failure the counts are `None` and `error` describes what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub up: Option<u64>,
    pub down: Option<u64>,
    pub remove: Option<u64>,
}

impl BatchOutcome {
    pub fn succeeded(up: u64, down: u64, remove: u64) -> Self {
        Self {
            success: true,
            error: None,
            up: Some(up),
            down: Some(down),
            remove: Some(remove),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            up: None,
            down: None,
            remove: None,
        }
    }
}

/// Result of casting a single vote.
///
/// `registered` is `false` when either end failed to resolve, the stored vote
/// already had the requested flag and weight, or the write was rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastOutcome {
    pub registered: bool,
    pub vote: Option<Vote>,
}

impl CastOutcome {
    pub fn registered(vote: Vote) -> Self {
        Self {
            registered: true,
            vote: Some(vote),
        }
    }

    pub fn unchanged() -> Self {
        Self {
            registered: false,
            vote: None,
        }
    }
}
