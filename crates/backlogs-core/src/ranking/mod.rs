//! Positional ranking: ordering rules and scope queries.
//!
//! - [`position`]: the NULLS-LAST comparator, rank computation and the
//!   detach / insert-after engine over a [`PositionStore`]
//! - [`query`]: translation of a [`BacklogScope`] into a [`StoryQuery`]

pub mod position;
pub mod query;

pub use position::{
    rank_fragment, rank_of, MemoryPositions, Placement, PositionIndex, PositionStore, RankKey,
    ORDER_CLAUSE,
};
pub use query::{
    AllVisible, BacklogScope, Fragment, Join, PublicProjects, RankQuery, ResolvedScope,
    SprintSelector, StoryQuery, VisibilityPredicate, VisibilityTarget,
};
