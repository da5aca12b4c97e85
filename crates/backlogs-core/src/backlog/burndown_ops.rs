//! Burndown operations for Backlogs.

use std::sync::Arc;

use tokio::task;

use super::{join_error, Backlogs};
use crate::{
    burndown::{Burndown, BurndownKey, BurndownSeriesBuilder},
    db::Database,
    error::{BacklogError, Result},
    params::{BurndownRequest, TaskHours},
};

impl Backlogs {
    /// Points and hours curves of a story over a sprint's active window.
    ///
    /// The sprint defaults to the story's current one. Returns `None` when
    /// the story is not a story-type item or no sprint resolves. Results are
    /// cached per (story, sprint) until the story is updated.
    pub async fn burndown(&self, params: &BurndownRequest) -> Result<Option<Burndown>> {
        let db_path = self.db_path.clone();
        let config = Arc::clone(&self.config);
        let cache = Arc::clone(&self.cache);
        let story_id = params.story_id;
        let requested_sprint = params.sprint_id;

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            let story = db
                .get_story(story_id)?
                .ok_or(BacklogError::StoryNotFound { id: story_id })?;
            if !config.is_story_tracker(story.tracker_id) {
                return Ok(None);
            }
            let Some(sprint_id) = requested_sprint.or(story.sprint_id) else {
                return Ok(None);
            };
            let sprint = db
                .get_sprint(sprint_id)?
                .ok_or(BacklogError::SprintNotFound { id: sprint_id })?;

            let builder = BurndownSeriesBuilder::new(&db, &config);
            cache
                .get_or_compute(BurndownKey::new(story.id, sprint.id), &mut || {
                    builder
                        .build(&story, Some(&sprint))
                        .map(Option::unwrap_or_default)
                })
                .map(Some)
        })
        .await
        .map_err(join_error)?
    }

    /// Records a task's remaining hours and drops cached burndowns of its
    /// story.
    pub async fn record_task_hours(&self, params: &TaskHours) -> Result<()> {
        let db_path = self.db_path.clone();
        let task_id = params.task_id;
        let day = params.day;
        let hours = params.hours;

        let story_id = task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.record_task_hours(task_id, day, hours)
        })
        .await
        .map_err(join_error)??;

        self.cache.invalidate_story(story_id);
        Ok(())
    }
}
