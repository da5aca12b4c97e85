//! Sprint model and its active window of days.

use std::collections::BTreeSet;

use jiff::civil::{Date, Weekday};
use serde::{Deserialize, Serialize};

use super::{IssueStatus, SprintStatus};

/// A time-boxed container of stories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sprint {
    pub id: u64,
    pub project_id: u64,
    pub name: String,
    #[serde(default)]
    pub status: SprintStatus,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    /// Status ids that count as accepted in this sprint. Empty means the
    /// configured default applies.
    #[serde(default)]
    pub success_statuses: BTreeSet<u64>,
}

impl Sprint {
    /// A burndown needs both ends of the date range.
    pub fn has_burndown(&self) -> bool {
        matches!((self.start_date, self.end_date), (Some(start), Some(end)) if start <= end)
    }

    /// Days of the active window, start and end inclusive.
    pub fn days(&self, skip_weekends: bool) -> Vec<Date> {
        let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
            return Vec::new();
        };

        start
            .series(jiff::Span::new().days(1))
            .take_while(|day| *day <= end)
            .filter(|day| {
                !skip_weekends || !matches!(day.weekday(), Weekday::Saturday | Weekday::Sunday)
            })
            .collect()
    }

    /// The acceptance predicate: does `status` count as success here?
    pub fn accepts(&self, status: &IssueStatus, default_success: &BTreeSet<u64>) -> bool {
        if self.success_statuses.is_empty() {
            default_success.contains(&status.id)
        } else {
            self.success_statuses.contains(&status.id)
        }
    }
}
