//! Ranked backlog operations for Backlogs.

use std::{collections::BTreeMap, sync::Arc};

use tokio::task;

use super::{join_error, Backlogs};
use crate::{
    collaborators::{StoryFinder, TaskSource},
    config::BacklogsConfig,
    db::Database,
    error::{BacklogError, Result},
    models::{
        attributes::{CREATE_EXCLUDED_FIELDS, UPDATE_EXCLUDED_FIELDS},
        parse_points, RankedStory, Story, StoryAttributes, TaskStatusCounts,
    },
    params::{AtRank, CreateStory, Id, MoveStory, Reposition, SetPoints, UpdateStory, UpdatedSince},
    ranking::{rank_fragment, BacklogScope, Fragment, Placement, RankQuery, VisibilityPredicate},
};

impl Backlogs {
    /// Stories of a scope in rank order, numbered from 1.
    ///
    /// # Errors
    ///
    /// Returns `BacklogError::Configuration` if the scope names neither a
    /// project nor sprints.
    pub async fn backlog(&self, scope: &BacklogScope) -> Result<Vec<RankedStory>> {
        self.ranked(scope.clone(), Vec::new()).await
    }

    /// The product backlog of a project: open, unassigned stories.
    pub async fn product_backlog(
        &self,
        project_id: u64,
        limit: Option<u64>,
    ) -> Result<Vec<RankedStory>> {
        self.backlog(&BacklogScope::project(project_id).with_limit(limit))
            .await
    }

    /// The backlog of one sprint, open and closed stories alike.
    pub async fn sprint_backlog(&self, sprint_id: u64) -> Result<Vec<RankedStory>> {
        self.backlog(&BacklogScope::sprint(sprint_id)).await
    }

    /// Backlogs of several sprints keyed by sprint id. Ranks restart at 1
    /// in every sprint, and every requested sprint has an entry.
    pub async fn backlogs_by_sprint(
        &self,
        sprint_ids: &[u64],
    ) -> Result<BTreeMap<u64, Vec<RankedStory>>> {
        let stories = self
            .ranked(BacklogScope::sprints(sprint_ids.to_vec()), Vec::new())
            .await?;

        let mut grouped: BTreeMap<u64, Vec<Story>> =
            sprint_ids.iter().map(|id| (*id, Vec::new())).collect();
        for entry in stories {
            if let Some(sprint_id) = entry.story.sprint_id {
                grouped.entry(sprint_id).or_default().push(entry.story);
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(sprint_id, stories)| (sprint_id, RankedStory::number(stories)))
            .collect())
    }

    /// Open stories of one project in any sprint or none, ranked.
    pub async fn open_stories(&self, project_id: u64) -> Result<Vec<RankedStory>> {
        let db_path = self.db_path.clone();
        let config = Arc::clone(&self.config);
        let visibility = Arc::clone(&self.visibility);

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            let query = RankQuery::new(&config.story_trackers, visibility.as_ref())
                .open_in_project(project_id);
            let stories = db.find_stories(&query)?;
            warn_on_duplicate_positions(&stories);
            Ok(RankedStory::number(stories))
        })
        .await
        .map_err(join_error)?
    }

    /// The story at a 1-based rank of a scope, or `None` when the rank is 0
    /// or beyond the scope's size.
    pub async fn at_rank(&self, params: &AtRank) -> Result<Option<Story>> {
        let rank = params.rank;
        // SQLite offsets are signed 64-bit; no scope holds that many stories
        if rank == 0 || i64::try_from(rank - 1).is_err() {
            return Ok(None);
        }

        let db_path = self.db_path.clone();
        let config = Arc::clone(&self.config);
        let visibility = Arc::clone(&self.visibility);
        let scope = params.scope.clone();

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            let resolved = db.resolve_scope(&scope)?;
            let query = RankQuery::new(&config.story_trackers, visibility.as_ref())
                .build(&resolved, &[])?;

            if let Some(limit) = query.limit {
                if rank > limit {
                    return Ok(None);
                }
            }
            Ok(db.find_stories(&query.at_rank(rank))?.into_iter().next())
        })
        .await
        .map_err(join_error)?
    }

    /// Rank of a stored story in its sprint, or in its project's product
    /// backlog when it has no sprint. `None` for stories of other trackers.
    pub async fn rank_of(&self, params: &Id) -> Result<Option<u64>> {
        let db_path = self.db_path.clone();
        let config = Arc::clone(&self.config);
        let visibility = Arc::clone(&self.visibility);
        let story_id = params.id;

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            let story = db
                .get_story(story_id)?
                .ok_or(BacklogError::StoryNotFound { id: story_id })?;
            if !config.is_story_tracker(story.tracker_id) {
                return Ok(None);
            }

            let scope = match story.sprint_id {
                Some(sprint_id) => BacklogScope::sprint(sprint_id),
                None => BacklogScope::project(story.project_id),
            };
            let resolved = db.resolve_scope(&scope)?;
            let query = RankQuery::new(&config.story_trackers, visibility.as_ref())
                .build(&resolved, &[rank_fragment(story.rank_key())])?;
            db.count_stories(&query).map(Some)
        })
        .await
        .map_err(join_error)?
    }

    /// Retrieves a story by its ID.
    pub async fn get_story(&self, params: &Id) -> Result<Option<Story>> {
        let db_path = self.db_path.clone();
        let story_id = params.id;

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.get_story(story_id)
        })
        .await
        .map_err(join_error)?
    }

    /// Creates a story from loose attributes and places it after
    /// `prev_id` (on top when absent).
    ///
    /// Unrecognized attribute keys are dropped. The tracker must be one of
    /// the configured story trackers.
    pub async fn create_and_position(&self, params: &CreateStory) -> Result<Story> {
        let attrs = StoryAttributes::from_map(&params.attributes, CREATE_EXCLUDED_FIELDS)?;
        check_tracker(&self.config, &attrs)?;

        let db_path = self.db_path.clone();
        let prev_id = params.prev_id;

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.create_and_position(&attrs, prev_id)
        })
        .await
        .map_err(join_error)?
    }

    /// Applies attribute changes, then repositions the story if asked to.
    /// Cached burndowns of the story are dropped.
    pub async fn update_and_reposition(&self, params: &UpdateStory) -> Result<Story> {
        let attrs = StoryAttributes::from_map(&params.attributes, UPDATE_EXCLUDED_FIELDS)?;
        check_tracker(&self.config, &attrs)?;
        self.apply_update(params.id, attrs, params.reposition).await
    }

    /// Moves a story directly after another one, or to the top.
    pub async fn move_after(&self, params: &MoveStory) -> Result<Placement> {
        let db_path = self.db_path.clone();
        let story_id = params.id;
        let prev_id = params.prev_id;

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.move_after(story_id, prev_id)
        })
        .await
        .map_err(join_error)?
    }

    /// Takes a story out of the ordered list.
    pub async fn remove_from_list(&self, params: &Id) -> Result<()> {
        let db_path = self.db_path.clone();
        let story_id = params.id;

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.remove_from_list(story_id)
        })
        .await
        .map_err(join_error)?
    }

    /// Sets a story's points from text entry.
    pub async fn set_points(&self, params: &SetPoints) -> Result<Story> {
        let attrs = StoryAttributes {
            story_points: Some(parse_points(&params.points)?),
            ..StoryAttributes::default()
        };
        self.apply_update(params.id, attrs, None).await
    }

    /// Open and closed counts of a story's child tasks.
    pub async fn task_status(&self, params: &Id) -> Result<TaskStatusCounts> {
        let db_path = self.db_path.clone();
        let story_id = params.id;

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            if db.get_story(story_id)?.is_none() {
                return Err(BacklogError::StoryNotFound { id: story_id });
            }
            let tasks = db.child_tasks(story_id)?;
            Ok(TaskStatusCounts::tally(&tasks))
        })
        .await
        .map_err(join_error)?
    }

    /// Stories of a project updated after an instant, oldest update first.
    pub async fn updated_since(&self, params: &UpdatedSince) -> Result<Vec<Story>> {
        let db_path = self.db_path.clone();
        let trackers: Vec<u64> = self.config.story_trackers.iter().copied().collect();
        let project_id = params.project_id;
        let since = params.since;

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.stories_updated_since(project_id, since, &trackers)
        })
        .await
        .map_err(join_error)?
    }

    async fn apply_update(
        &self,
        story_id: u64,
        attrs: StoryAttributes,
        reposition: Option<Reposition>,
    ) -> Result<Story> {
        let db_path = self.db_path.clone();

        let story = task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.update_and_reposition(story_id, &attrs, reposition.map(Reposition::predecessor))
        })
        .await
        .map_err(join_error)??;

        self.cache.invalidate_story(story_id);
        Ok(story)
    }

    async fn ranked(
        &self,
        scope: BacklogScope,
        filters: Vec<Fragment>,
    ) -> Result<Vec<RankedStory>> {
        let db_path = self.db_path.clone();
        let config = Arc::clone(&self.config);
        let visibility = Arc::clone(&self.visibility);

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            ranked_stories(&db, &config, visibility.as_ref(), &scope, &filters)
        })
        .await
        .map_err(join_error)?
    }
}

fn ranked_stories(
    db: &Database,
    config: &BacklogsConfig,
    visibility: &dyn VisibilityPredicate,
    scope: &BacklogScope,
    filters: &[Fragment],
) -> Result<Vec<RankedStory>> {
    let resolved = db.resolve_scope(scope)?;
    let query = RankQuery::new(&config.story_trackers, visibility).build(&resolved, filters)?;
    let stories = db.find_stories(&query)?;
    warn_on_duplicate_positions(&stories);
    Ok(RankedStory::number(stories))
}

fn warn_on_duplicate_positions(stories: &[Story]) {
    for pair in stories.windows(2) {
        if let (Some(a), Some(b)) = (pair[0].position, pair[1].position) {
            if a == b {
                log::warn!(
                    "Stories {} and {} share position {a}; ordering them by id",
                    pair[0].id,
                    pair[1].id
                );
            }
        }
    }
}

fn check_tracker(config: &BacklogsConfig, attrs: &StoryAttributes) -> Result<()> {
    if let Some(tracker_id) = attrs.tracker_id {
        if !config.is_story_tracker(tracker_id) {
            return Err(BacklogError::invalid_input("tracker_id")
                .with_reason(format!("tracker {tracker_id} is not a story tracker")));
        }
    }
    Ok(())
}
