//! Interfaces to the stores that own issues, sprints and their history.
//!
//! The ranking and burndown engines only see these traits;
//! [`crate::db::Database`] implements all of them over SQLite.

use jiff::civil::Date;

use crate::{
    error::Result,
    models::{IssueStatus, Story, Task},
    ranking::StoryQuery,
};

/// Executes story queries produced by [`crate::ranking::RankQuery`].
pub trait StoryFinder {
    /// Stories matching the query, in the query's order.
    fn find_stories(&self, query: &StoryQuery) -> Result<Vec<Story>>;

    /// Number of stories matching the query, ignoring limit and offset.
    fn count_stories(&self, query: &StoryQuery) -> Result<u64>;
}

/// Story attributes tracked per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryAttribute {
    StatusId,
    SprintId,
    StoryPoints,
}

impl HistoryAttribute {
    /// Column/journal name of the attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAttribute::StatusId => "status_id",
            HistoryAttribute::SprintId => "sprint_id",
            HistoryAttribute::StoryPoints => "story_points",
        }
    }
}

/// Day-indexed attribute history of stories.
pub trait HistoryReader {
    /// One value per entry of `days`; `None` where the value is unknown.
    fn history_at(
        &self,
        story_id: u64,
        attribute: HistoryAttribute,
        days: &[Date],
    ) -> Result<Vec<Option<i64>>>;
}

/// Child tasks of stories and their remaining-hours curves.
pub trait TaskSource {
    fn child_tasks(&self, story_id: u64) -> Result<Vec<Task>>;

    /// Remaining hours of a task on each of `days`; `None` outside the
    /// task's tracked range.
    fn remaining_hours(&self, task_id: u64, days: &[Date]) -> Result<Vec<Option<f64>>>;
}

/// Lookup of workflow statuses by id.
pub trait StatusCatalog {
    fn status(&self, status_id: u64) -> Result<Option<IssueStatus>>;
}
