//! Merging of per-day attribute sequences into aligned day records.

use std::collections::BTreeSet;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::models::{IssueStatus, Sprint};

/// Reconciled values of one day on which the story was in the sprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DaySample {
    pub points: Option<u32>,
    pub open: bool,
    pub accepted: bool,
    /// Remaining hours, forced to 0 when the story is not open
    pub hours: f64,
    pub points_accepted: Option<u32>,
    pub points_resolved: Option<u32>,
}

/// One row per day of the active window. `sample` is `None` on days the story
/// was not part of the sprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub day: Date,
    pub sample: Option<DaySample>,
}

impl DayRecord {
    pub fn in_sprint(&self) -> bool {
        self.sample.is_some()
    }
}

/// Per-day columns collected before reconciliation.
#[derive(Debug, Clone)]
pub struct MergedSeries {
    days: Vec<Date>,
    in_sprint: Vec<bool>,
    points: Vec<Option<u32>>,
    status: Vec<Option<IssueStatus>>,
    hours: Vec<f64>,
}

impl MergedSeries {
    /// Starts an empty series over `days`: nobody in the sprint, no points,
    /// unknown status and zero hours.
    pub fn new(days: Vec<Date>) -> Self {
        let len = days.len();
        Self {
            days,
            in_sprint: vec![false; len],
            points: vec![None; len],
            status: vec![None; len],
            hours: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn merge_in_sprint(&mut self, values: impl IntoIterator<Item = bool>) -> &mut Self {
        overlay(&mut self.in_sprint, values, false);
        self
    }

    pub fn merge_points(&mut self, values: impl IntoIterator<Item = Option<u32>>) -> &mut Self {
        overlay(&mut self.points, values, None);
        self
    }

    pub fn merge_status(
        &mut self,
        values: impl IntoIterator<Item = Option<IssueStatus>>,
    ) -> &mut Self {
        overlay(&mut self.status, values, None);
        self
    }

    /// Adds a task's curve to the hours column; unknown days add nothing.
    pub fn add_hours(&mut self, values: impl IntoIterator<Item = Option<f64>>) -> &mut Self {
        for (total, value) in self.hours.iter_mut().zip(values) {
            *total += value.unwrap_or(0.0);
        }
        self
    }

    /// Applies the sprint rules day by day.
    pub fn reconcile(self, sprint: &Sprint, default_success: &BTreeSet<u64>) -> Vec<DayRecord> {
        let Self {
            days,
            in_sprint,
            points,
            status,
            hours,
        } = self;

        days.into_iter()
            .zip(in_sprint)
            .zip(points)
            .zip(status)
            .zip(hours)
            .map(|((((day, in_sprint), points), status), hours)| {
                let sample = in_sprint.then(|| {
                    let open = status.as_ref().map_or(true, |s| !s.is_closed);
                    let accepted = status
                        .as_ref()
                        .is_some_and(|s| sprint.accepts(s, default_success));
                    let hours = if open { hours } else { 0.0 };
                    DaySample {
                        points,
                        open,
                        accepted,
                        hours,
                        points_accepted: if accepted { points } else { None },
                        points_resolved: if accepted || hours == 0.0 {
                            points
                        } else {
                            None
                        },
                    }
                });
                DayRecord { day, sample }
            })
            .collect()
    }
}

/// Writes `values` over `column`, padding short input with `missing`.
fn overlay<T: Clone>(column: &mut [T], values: impl IntoIterator<Item = T>, missing: T) {
    let mut values = values.into_iter();
    for slot in column.iter_mut() {
        *slot = values.next().unwrap_or_else(|| missing.clone());
    }
}

/// The four aligned curves of a story's burndown in one sprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Burndown {
    pub days: Vec<Date>,
    pub points: Vec<Option<u32>>,
    pub points_accepted: Vec<Option<u32>>,
    pub points_resolved: Vec<Option<u32>>,
    /// Remaining hours; `None` when the story was closed or outside the sprint
    pub hours: Vec<Option<f64>>,
}

impl Burndown {
    pub fn from_records(records: &[DayRecord]) -> Self {
        let mut burndown = Self::default();
        for record in records {
            let sample = record.sample.as_ref();
            burndown.days.push(record.day);
            burndown.points.push(sample.and_then(|s| s.points));
            burndown
                .points_accepted
                .push(sample.and_then(|s| s.points_accepted));
            burndown
                .points_resolved
                .push(sample.and_then(|s| s.points_resolved));
            burndown
                .hours
                .push(sample.filter(|s| s.open).map(|s| s.hours));
        }
        burndown
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;
    use crate::models::SprintStatus;

    fn sprint(days: i8) -> Sprint {
        Sprint {
            id: 1,
            project_id: 1,
            name: "S1".to_string(),
            status: SprintStatus::Open,
            start_date: Some(date(2024, 5, 6)),
            end_date: Some(date(2024, 5, 5 + days)),
            success_statuses: BTreeSet::from([3]),
        }
    }

    fn status(id: u64, is_closed: bool) -> Option<IssueStatus> {
        Some(IssueStatus {
            id,
            name: format!("status {id}"),
            is_closed,
        })
    }

    fn open() -> Option<IssueStatus> {
        status(1, false)
    }

    fn series(sprint: &Sprint) -> MergedSeries {
        MergedSeries::new(sprint.days(false))
    }

    #[test]
    fn test_five_day_window_scenario() {
        let sprint = sprint(5);
        let mut merged = series(&sprint);
        merged
            .merge_in_sprint([true, true, true, false, false])
            .merge_points([Some(3); 5])
            .merge_status(vec![open(); 5])
            .add_hours([Some(8.0), Some(6.0), Some(0.0), Some(0.0), Some(0.0)]);

        let burndown = Burndown::from_records(&merged.reconcile(&sprint, &BTreeSet::new()));
        assert_eq!(burndown.points, vec![Some(3), Some(3), Some(3), None, None]);
        assert_eq!(burndown.points_accepted, vec![None; 5]);
        assert_eq!(
            burndown.points_resolved,
            vec![None, None, Some(3), None, None]
        );
        assert_eq!(
            burndown.hours,
            vec![Some(8.0), Some(6.0), Some(0.0), None, None]
        );
    }

    #[test]
    fn test_out_of_sprint_day_is_blank() {
        let sprint = sprint(2);
        let mut merged = series(&sprint);
        merged
            .merge_in_sprint([false, true])
            .merge_points([Some(5), Some(5)])
            .merge_status(vec![status(3, true), status(3, true)])
            .add_hours([Some(4.0), Some(4.0)]);

        let records = merged.reconcile(&sprint, &BTreeSet::new());
        assert!(!records[0].in_sprint());
        let burndown = Burndown::from_records(&records);
        assert_eq!(burndown.points[0], None);
        assert_eq!(burndown.points_accepted[0], None);
        assert_eq!(burndown.points_resolved[0], None);
        assert_eq!(burndown.hours[0], None);
    }

    #[test]
    fn test_accepted_day_counts_as_accepted_and_resolved() {
        let sprint = sprint(1);
        let mut merged = series(&sprint);
        merged
            .merge_in_sprint([true])
            .merge_points([Some(8)])
            .merge_status(vec![status(3, false)])
            .add_hours([Some(5.0)]);

        let records = merged.reconcile(&sprint, &BTreeSet::new());
        let sample = records[0].sample.unwrap();
        assert!(sample.accepted);
        assert_eq!(sample.points_accepted, Some(8));
        assert_eq!(sample.points_resolved, Some(8));
    }

    #[test]
    fn test_closed_day_burns_no_hours() {
        let sprint = sprint(1);
        let mut merged = series(&sprint);
        merged
            .merge_in_sprint([true])
            .merge_points([Some(2)])
            .merge_status(vec![status(9, true)])
            .add_hours([Some(12.0)]);

        let records = merged.reconcile(&sprint, &BTreeSet::new());
        let sample = records[0].sample.unwrap();
        assert!(!sample.open);
        assert_eq!(sample.hours, 0.0);
        // closed but not accepted still resolves: nothing left to burn
        assert_eq!(sample.points_resolved, Some(2));
        assert_eq!(sample.points_accepted, None);
        assert_eq!(Burndown::from_records(&records).hours, vec![None]);
    }

    #[test]
    fn test_unknown_status_is_open_and_unaccepted() {
        let sprint = sprint(1);
        let mut merged = series(&sprint);
        merged.merge_in_sprint([true]).merge_points([Some(1)]).add_hours([Some(2.5)]);

        let sample = merged.reconcile(&sprint, &BTreeSet::new())[0].sample.unwrap();
        assert!(sample.open);
        assert!(!sample.accepted);
        assert_eq!(sample.hours, 2.5);
        assert_eq!(sample.points_resolved, None);
    }

    #[test]
    fn test_short_sequences_pad_with_unknown() {
        let sprint = sprint(3);
        let mut merged = series(&sprint);
        merged
            .merge_in_sprint([true, true, true])
            .merge_points([Some(4)])
            .add_hours([Some(1.0)])
            .add_hours([Some(2.0), Some(3.0)]);

        let burndown = Burndown::from_records(&merged.reconcile(&sprint, &BTreeSet::new()));
        assert_eq!(burndown.points, vec![Some(4), None, None]);
        assert_eq!(burndown.hours, vec![Some(3.0), Some(3.0), Some(0.0)]);
        // day 3 has no points, so nothing is resolved even with zero hours
        assert_eq!(burndown.points_resolved, vec![None, None, None]);
    }
}
