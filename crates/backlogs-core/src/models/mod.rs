//! Data models for stories, tasks and sprints.
//!
//! Stories carry the sparse `position` used by [`crate::ranking`]; sprints
//! carry the date range and acceptance predicate used by
//! [`crate::burndown`]. Tasks only contribute remaining hours.

pub mod attributes;
pub mod points;
pub mod sprint;
pub mod status;
pub mod story;
pub mod task;

#[cfg(test)]
mod tests;

pub use attributes::{StoryAttributes, RECOGNIZED_STORY_FIELDS};
pub use points::{parse_points, points_display};
pub use sprint::Sprint;
pub use status::{IssueStatus, SprintStatus};
pub use story::{RankedStory, Story};
pub use task::{Task, TaskStatusCounts};
