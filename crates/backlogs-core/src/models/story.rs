//! Story model definition and related functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::ranking::RankKey;

/// A backlog item ordered by its sparse `position`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    /// Unique, immutable identifier
    pub id: u64,

    /// ID of the owning project
    pub project_id: u64,

    /// Tracker the issue belongs to
    pub tracker_id: u64,

    /// Current workflow status
    pub status_id: u64,

    /// Whether the current status is a closed one
    #[serde(default)]
    pub is_closed: bool,

    /// Assigned sprint; `None` means the story sits in the product backlog
    pub sprint_id: Option<u64>,

    /// Short summary of the story
    pub subject: String,

    /// Detailed multi-line description
    pub description: Option<String>,

    /// Estimate in points; `Some(0)` means sized as small
    pub story_points: Option<u32>,

    /// Sparse ordering value; `None` sorts after every positioned story
    pub position: Option<i64>,

    /// Timestamp when the story was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the story was last updated (UTC)
    pub updated_at: Timestamp,
}

impl Story {
    /// Whether the story takes part in the positioned order.
    pub fn in_list(&self) -> bool {
        self.position.is_some()
    }

    /// The key this story sorts by.
    pub fn rank_key(&self) -> RankKey {
        RankKey::new(self.id, self.position)
    }

    /// Points rendered for display, with `notsized` for unestimated stories.
    pub fn points_display(&self, notsized: &str) -> String {
        super::points::points_display(self.story_points, notsized)
    }
}

/// A story annotated with its 1-based rank in the list it was loaded from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedStory {
    /// 1-based ordinal within the scope's ordering
    pub rank: u64,

    #[serde(flatten)]
    pub story: Story,
}

impl RankedStory {
    /// Assigns ranks 1..=n to stories that are already in rank order.
    pub fn number(stories: Vec<Story>) -> Vec<RankedStory> {
        stories
            .into_iter()
            .enumerate()
            .map(|(i, story)| RankedStory {
                rank: i as u64 + 1,
                story,
            })
            .collect()
    }
}
