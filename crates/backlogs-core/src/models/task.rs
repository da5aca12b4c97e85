//! Task model: child work items that only feed burndown hours.

use serde::{Deserialize, Serialize};

/// A child work item of a story.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    /// Parent story
    pub story_id: u64,
    pub subject: String,
    pub status_id: u64,
    pub is_closed: bool,
}

/// Open/closed counts over a story's child tasks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatusCounts {
    pub open: u32,
    pub closed: u32,
}

impl TaskStatusCounts {
    /// Tallies the given tasks.
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut acc, task| {
            if task.is_closed {
                acc.closed += 1;
            } else {
                acc.open += 1;
            }
            acc
        })
    }
}
