//! Ranked story backlogs and sprint burndowns.
//!
//! This crate keeps a total order over the stories of a project or sprint
//! and derives per-day burndown curves from the dated history of story and
//! task attributes.
//!
//! # Architecture
//!
//! - **Ranking** ([`ranking`]): the NULLS-LAST comparator, the
//!   detach / insert-after position engine and the scope-to-query builder
//! - **Burndown** ([`burndown`]): per-day series merging, sprint acceptance
//!   rules and a get-or-compute cache keyed by (story, sprint)
//! - **Collaborators** ([`collaborators`]): the store interfaces both engines
//!   read through, implemented over SQLite by [`db::Database`]
//! - **Facade** ([`backlog`]): the async [`Backlogs`] API
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use backlogs_core::{params::CreateStory, BacklogsBuilder, BacklogsConfig};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backlogs = BacklogsBuilder::new()
//!     .with_database_path("backlogs.db")
//!     .with_config(BacklogsConfig::with_story_trackers([1]))
//!     .build()
//!     .await?;
//!
//! let attributes = json!({
//!     "subject": "Checkout flow",
//!     "project_id": 1,
//!     "tracker_id": 1,
//!     "status_id": 1,
//! });
//! let story = backlogs
//!     .create_and_position(&CreateStory {
//!         attributes: attributes.as_object().cloned().unwrap_or_default(),
//!         prev_id: None,
//!     })
//!     .await?;
//!
//! let product_backlog = backlogs.product_backlog(story.project_id, None).await?;
//! assert_eq!(product_backlog[0].story.id, story.id);
//! # Ok(())
//! # }
//! ```

pub mod backlog;
pub mod burndown;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod params;
pub mod ranking;

// Re-export commonly used types
pub use backlog::{Backlogs, BacklogsBuilder};
pub use burndown::{Burndown, BurndownCache, BurndownKey, EvictionPolicy, MemoryBurndownCache};
pub use config::BacklogsConfig;
pub use db::Database;
pub use error::{BacklogError, Result};
pub use models::{IssueStatus, RankedStory, Sprint, SprintStatus, Story, Task, TaskStatusCounts};
pub use params::{
    AtRank, BurndownRequest, CreateStory, Id, MoveStory, Reposition, SetPoints, TaskHours,
    UpdateStory, UpdatedSince,
};
pub use ranking::{BacklogScope, Placement, RankKey, SprintSelector, VisibilityPredicate};
