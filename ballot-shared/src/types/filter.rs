use crate::types::{EntityKey, Scope, Vote};

/// Which scopes a query covers.
///
/// `Only(Scope::unscoped())` matches unscoped votes only; it is not a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScopeFilter {
    #[default]
    Any,
    Only(Scope),
}

impl ScopeFilter {
    pub fn matches(&self, scope: &Scope) -> bool {
        match self {
            Self::Any => true,
            Self::Only(expected) => expected == scope,
        }
    }
}

impl From<Scope> for ScopeFilter {
    fn from(scope: Scope) -> Self {
        Self::Only(scope)
    }
}

/// Order in which matching votes are returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VoteOrder {
    /// Ascending id, i.e. insertion order.
    #[default]
    Insertion,
    /// Most recently updated first; ties broken by `created_at`, then `id`.
    Latest,
}

/// Equality and membership filters over the vote columns.
///
/// Every `None` field is unconstrained. Builders consume and return the
/// filter so it can be assembled inline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteFilter {
    pub voter: Option<EntityKey>,
    pub voter_type: Option<String>,
    pub votable: Option<EntityKey>,
    pub votable_type: Option<String>,
    pub votables: Option<Vec<EntityKey>>,
    pub scope: ScopeFilter,
    pub flag: Option<bool>,
    pub limit: Option<usize>,
}

impl VoteFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn voter(mut self, voter: &EntityKey) -> Self {
        self.voter = Some(voter.clone());
        self
    }

    pub fn voter_type(mut self, type_name: impl Into<String>) -> Self {
        self.voter_type = Some(type_name.into());
        self
    }

    pub fn votable(mut self, votable: &EntityKey) -> Self {
        self.votable = Some(votable.clone());
        self
    }

    pub fn votable_type(mut self, type_name: impl Into<String>) -> Self {
        self.votable_type = Some(type_name.into());
        self
    }

    /// Restricts the filter to votes on any of `votables`.
    pub fn votables(mut self, votables: Vec<EntityKey>) -> Self {
        self.votables = Some(votables);
        self
    }

    pub fn scope(mut self, scope: impl Into<ScopeFilter>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn flag(mut self, flag: Option<bool>) -> Self {
        self.flag = flag;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Applies the caller-facing part of a query on top of this filter.
    pub fn query(self, query: &VoteQuery) -> Self {
        self.scope(query.scope.clone()).flag(query.flag)
    }

    /// Evaluates the filter against a single vote. `limit` is not considered.
    pub fn matches(&self, vote: &Vote) -> bool {
        self.voter.as_ref().is_none_or(|k| *k == vote.voter)
            && self
                .voter_type
                .as_ref()
                .is_none_or(|t| *t == vote.voter.type_name)
            && self.votable.as_ref().is_none_or(|k| *k == vote.votable)
            && self
                .votable_type
                .as_ref()
                .is_none_or(|t| *t == vote.votable.type_name)
            && self
                .votables
                .as_ref()
                .is_none_or(|keys| keys.contains(&vote.votable))
            && self.scope.matches(&vote.scope)
            && self.flag.is_none_or(|f| f == vote.flag)
    }
}

/// Caller-facing narrowing of a listing or existence query.
///
/// The default covers the unscoped partition with either flag, mirroring a
/// query issued without an explicit scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteQuery {
    pub scope: ScopeFilter,
    pub flag: Option<bool>,
}

impl Default for VoteQuery {
    fn default() -> Self {
        Self {
            scope: ScopeFilter::Only(Scope::unscoped()),
            flag: None,
        }
    }
}

impl VoteQuery {
    pub fn scoped(scope: impl Into<Scope>) -> Self {
        Self {
            scope: ScopeFilter::Only(scope.into()),
            flag: None,
        }
    }

    pub fn any_scope() -> Self {
        Self {
            scope: ScopeFilter::Any,
            flag: None,
        }
    }

    pub fn up(mut self) -> Self {
        self.flag = Some(true);
        self
    }

    pub fn down(mut self) -> Self {
        self.flag = Some(false);
        self
    }
}
