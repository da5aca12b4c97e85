//! Parameter structures for backlog operations.
//!
//! These are the plain request shapes accepted by [`crate::Backlogs`]. They
//! derive serde so an outer surface can deserialize them directly, and
//! `schemars::JsonSchema` when the `schema` feature is enabled.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ranking::BacklogScope;

/// Generic parameters for operations requiring just an ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Id {
    /// The ID of the resource to operate on
    pub id: u64,
}

/// Parameters for creating a story and placing it in the backlog.
///
/// Attribute keys outside the recognized story fields are dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CreateStory {
    /// Raw story attributes keyed by field name
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Story to place the new one after; `None` puts it on top
    pub prev_id: Option<u64>,
}

/// Where an updated story moves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum Reposition {
    /// First in the list
    Top,
    /// Directly after the given story
    After(u64),
}

impl Reposition {
    /// The predecessor passed to insert-after.
    pub fn predecessor(self) -> Option<u64> {
        match self {
            Reposition::Top => None,
            Reposition::After(id) => Some(id),
        }
    }
}

/// Parameters for updating a story's attributes and optionally moving it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct UpdateStory {
    /// ID of the story to update
    pub id: u64,
    /// Attributes to change; unrecognized keys are dropped
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Optional new place in the list
    pub reposition: Option<Reposition>,
}

/// Parameters for moving a story without changing its attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct MoveStory {
    /// ID of the story to move
    pub id: u64,
    /// Story to place it after; `None` moves it to the top
    pub prev_id: Option<u64>,
}

/// Parameters for looking up the story at a rank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct AtRank {
    /// Scope the rank is counted in
    pub scope: BacklogScope,
    /// 1-based rank
    pub rank: u64,
}

/// Parameters for a story's burndown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct BurndownRequest {
    /// Story whose burndown is computed
    pub story_id: u64,
    /// Sprint to compute it for; defaults to the story's current sprint
    pub sprint_id: Option<u64>,
}

/// Parameters for entering story points as text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SetPoints {
    /// ID of the story to estimate
    pub id: u64,
    /// `-` or blank clears, `S` means small, otherwise a non-negative number
    pub points: String,
}

/// Parameters for listing recently updated stories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct UpdatedSince {
    /// Project whose stories are listed
    pub project_id: u64,
    /// Only stories updated strictly after this instant
    #[cfg_attr(feature = "schema", schemars(with = "String"))]
    pub since: jiff::Timestamp,
}

/// Parameters for recording a task's remaining hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct TaskHours {
    /// Task whose estimate changed
    pub task_id: u64,
    /// Day the value takes effect
    #[cfg_attr(feature = "schema", schemars(with = "String"))]
    pub day: jiff::civil::Date,
    /// Remaining hours; `None` clears the estimate
    pub hours: Option<f64>,
}
