//! Burndown computation for one story in one sprint.

use std::collections::HashMap;

use super::series::{Burndown, DayRecord, MergedSeries};
use crate::{
    collaborators::{HistoryAttribute, HistoryReader, StatusCatalog, TaskSource},
    config::BacklogsConfig,
    error::Result,
    models::{IssueStatus, Sprint, Story},
};

/// Pulls day-indexed histories from `source` and reconciles them.
pub struct BurndownSeriesBuilder<'a, S> {
    source: &'a S,
    config: &'a BacklogsConfig,
}

impl<'a, S> BurndownSeriesBuilder<'a, S>
where
    S: HistoryReader + TaskSource + StatusCatalog,
{
    pub fn new(source: &'a S, config: &'a BacklogsConfig) -> Self {
        Self { source, config }
    }

    /// Per-day records, or `None` when the story is not a story-type item
    /// or there is no sprint.
    pub fn day_records(
        &self,
        story: &Story,
        sprint: Option<&Sprint>,
    ) -> Result<Option<Vec<DayRecord>>> {
        if !self.config.is_story_tracker(story.tracker_id) {
            return Ok(None);
        }
        let Some(sprint) = sprint else {
            return Ok(None);
        };
        if !sprint.has_burndown() {
            return Ok(Some(Vec::new()));
        }

        let days = sprint.days(self.config.skip_weekends);
        let mut series = MergedSeries::new(days.clone());

        let sprint_ids = self
            .source
            .history_at(story.id, HistoryAttribute::SprintId, &days)?;
        series.merge_in_sprint(
            sprint_ids
                .into_iter()
                .map(|value| value == Some(sprint.id as i64)),
        );

        let points = self
            .source
            .history_at(story.id, HistoryAttribute::StoryPoints, &days)?;
        series.merge_points(
            points
                .into_iter()
                .map(|value| value.and_then(|p| u32::try_from(p).ok())),
        );

        let status_ids = self
            .source
            .history_at(story.id, HistoryAttribute::StatusId, &days)?;
        series.merge_status(self.resolve_statuses(status_ids)?);

        for task in self.source.child_tasks(story.id)? {
            series.add_hours(self.source.remaining_hours(task.id, &days)?);
        }

        log::debug!(
            "Merged {} days of history for story {} in sprint {}",
            series.len(),
            story.id,
            sprint.id
        );

        Ok(Some(series.reconcile(sprint, &self.config.success_statuses)))
    }

    /// The four burndown curves, or `None` as for [`Self::day_records`].
    pub fn build(&self, story: &Story, sprint: Option<&Sprint>) -> Result<Option<Burndown>> {
        Ok(self
            .day_records(story, sprint)?
            .map(|records| Burndown::from_records(&records)))
    }

    fn resolve_statuses(&self, ids: Vec<Option<i64>>) -> Result<Vec<Option<IssueStatus>>> {
        let mut known: HashMap<i64, Option<IssueStatus>> = HashMap::new();
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            let status = match id {
                None => None,
                Some(id) => match known.get(&id) {
                    Some(status) => status.clone(),
                    None => {
                        let status = u64::try_from(id)
                            .ok()
                            .map(|id| self.source.status(id))
                            .transpose()?
                            .flatten();
                        known.insert(id, status.clone());
                        status
                    }
                },
            };
            resolved.push(status);
        }
        Ok(resolved)
    }
}
