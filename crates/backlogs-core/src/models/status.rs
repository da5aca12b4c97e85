//! Workflow and sprint status types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A workflow status as seen by the burndown rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueStatus {
    pub id: u64,
    pub name: String,
    /// Issues in this status count as closed
    pub is_closed: bool,
}

/// Type-safe enumeration of sprint statuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SprintStatus {
    /// Sprint accepts stories
    #[default]
    Open,

    /// Sprint is frozen but not finished
    Locked,

    /// Sprint is finished
    Closed,
}

impl FromStr for SprintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(SprintStatus::Open),
            "locked" => Ok(SprintStatus::Locked),
            "closed" => Ok(SprintStatus::Closed),
            _ => Err(format!("Invalid sprint status: {s}")),
        }
    }
}

impl SprintStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintStatus::Open => "open",
            SprintStatus::Locked => "locked",
            SprintStatus::Closed => "closed",
        }
    }
}
