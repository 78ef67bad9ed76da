use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EntityKey, Scope, Weight};

/// Primary key of a stored vote.
pub type VoteId = i64;

/// A single vote as stored in the `ballot_votes` table.
///
/// Both references carry canonical type names. `flag` is `true` for an up
/// vote and `false` for a down vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub votable: EntityKey,
    pub voter: EntityKey,
    pub flag: bool,
    pub weight: i64,
    pub scope: Scope,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    pub fn is_up(&self) -> bool {
        self.flag
    }

    pub fn is_down(&self) -> bool {
        !self.flag
    }
}

/// The fields of a vote that is about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVote {
    pub votable: EntityKey,
    pub voter: EntityKey,
    pub flag: bool,
    pub weight: Weight,
    pub scope: Scope,
}
