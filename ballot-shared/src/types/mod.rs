mod batch;
mod entity;
mod filter;
mod scope;
mod summary;
mod vote;
mod weight;

pub use batch::{BatchBallot, BatchOutcome, CastOutcome, LocatorParams, VotableSet};
pub use entity::{EntityHandle, EntityId, EntityKey};
pub use filter::{ScopeFilter, VoteFilter, VoteOrder, VoteQuery};
pub use scope::Scope;
pub use summary::{ScopeSummary, SummaryLocation, VoteSummary, VoteTally};
pub use vote::{NewVote, Vote, VoteId};
pub use weight::Weight;
