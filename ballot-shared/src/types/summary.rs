use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Scope;

/// Raw counts and weight sums for a set of votes, as returned by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub up: i64,
    pub down: i64,
    pub up_weight: i64,
    pub down_weight: i64,
}

/// Aggregate statistics for one scope of one votable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSummary {
    pub total: i64,
    pub up: i64,
    pub down: i64,
    pub score: i64,
    pub weighted_total: i64,
    pub weighted_score: i64,
}

impl ScopeSummary {
    /// Weighted score per vote, or `0.0` when there are no votes.
    pub fn weighted_average(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.weighted_score as f64 / self.total as f64
        }
    }
}

impl From<VoteTally> for ScopeSummary {
    fn from(tally: VoteTally) -> Self {
        Self {
            total: tally.up + tally.down,
            up: tally.up,
            down: tally.down,
            score: tally.up - tally.down,
            weighted_total: tally.up_weight + tally.down_weight,
            weighted_score: tally.up_weight - tally.down_weight,
        }
    }
}

/// The cached summary stored on a votable: one entry per scope.
///
/// Serialized as a JSON object keyed by scope name, with the unscoped entry
/// under the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteSummary(BTreeMap<String, ScopeSummary>);

impl VoteSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `scope`, or an all-zero summary if it was never computed.
    pub fn get(&self, scope: &Scope) -> ScopeSummary {
        self.0.get(scope.summary_key()).copied().unwrap_or_default()
    }

    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains_key(scope.summary_key())
    }

    /// Replaces the entry for `scope` wholesale, leaving other scopes untouched.
    pub fn merge(&mut self, scope: &Scope, summary: ScopeSummary) {
        self.0.insert(scope.summary_key().to_owned(), summary);
    }

    pub fn scopes(&self) -> impl Iterator<Item = (Scope, &ScopeSummary)> {
        self.0.iter().map(|(key, summary)| (Scope::named(key.as_str()), summary))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where a votable type keeps its serialized summary in the host schema.
///
/// A type registered with a location is a caching votable; a type without one
/// always reads its aggregates live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryLocation {
    pub table: String,
    pub key_column: String,
    pub column: String,
}

impl SummaryLocation {
    pub const DEFAULT_COLUMN: &'static str = "cached_ballot_summary";

    /// A location on `table`, keyed by `id`, in the `cached_ballot_summary` column.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_column: "id".to_owned(),
            column: Self::DEFAULT_COLUMN.to_owned(),
        }
    }

    pub fn with_key_column(mut self, key_column: impl Into<String>) -> Self {
        self.key_column = key_column.into();
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}
