//! Story queries, creation, updates and moves.

use jiff::{civil::Date, Timestamp, Zoned};
use rusqlite::{
    params, params_from_iter, types::Type, types::Value, Connection, OptionalExtension,
    TransactionBehavior,
};

use super::positions::StoryPositions;
use crate::{
    collaborators::{HistoryAttribute, StoryFinder},
    error::{BacklogError, DatabaseResultExt, Result},
    models::{Story, StoryAttributes},
    ranking::{Placement, PositionIndex, StoryQuery},
};

const STORY_COLUMNS: &str = "stories.id, stories.project_id, stories.tracker_id, stories.status_id, COALESCE((SELECT st.is_closed FROM issue_statuses st WHERE st.id = stories.status_id), 0), stories.sprint_id, stories.subject, stories.description, stories.story_points, stories.position, stories.created_at, stories.updated_at";
const INSERT_STORY_SQL: &str = "INSERT INTO stories (project_id, tracker_id, status_id, sprint_id, subject, description, story_points, position, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?9)";
const UPDATE_STORY_SQL: &str = "UPDATE stories SET tracker_id = ?1, status_id = ?2, sprint_id = ?3, subject = ?4, description = ?5, story_points = ?6, updated_at = ?7 WHERE id = ?8";
const CHECK_STATUS_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM issue_statuses WHERE id = ?1)";
const CHECK_SPRINT_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM sprints WHERE id = ?1)";
const CHECK_PROJECT_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)";

impl super::Database {
    /// Helper function to construct a Story from a database row
    fn build_story_from_row(row: &rusqlite::Row) -> rusqlite::Result<Story> {
        Ok(Story {
            id: row.get::<_, i64>(0)? as u64,
            project_id: row.get::<_, i64>(1)? as u64,
            tracker_id: row.get::<_, i64>(2)? as u64,
            status_id: row.get::<_, i64>(3)? as u64,
            is_closed: row.get(4)?,
            sprint_id: row.get::<_, Option<i64>>(5)?.map(|id| id as u64),
            subject: row.get(6)?,
            description: row.get(7)?,
            story_points: row.get::<_, Option<i64>>(8)?.map(|p| p as u32),
            position: row.get(9)?,
            created_at: row.get::<_, String>(10)?.parse::<Timestamp>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e))
            })?,
            updated_at: row.get::<_, String>(11)?.parse::<Timestamp>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e))
            })?,
        })
    }

    /// Retrieves a single story by its ID.
    pub fn get_story(&self, story_id: u64) -> Result<Option<Story>> {
        load_story(&self.connection, story_id)
    }

    /// Persists a story and places it after `prev_id` in one transaction.
    ///
    /// `subject`, `project_id`, `tracker_id` and `status_id` are required.
    pub fn create_and_position(
        &mut self,
        attrs: &StoryAttributes,
        prev_id: Option<u64>,
    ) -> Result<Story> {
        let subject = required(attrs.subject.clone(), "subject")?;
        let project_id = required(attrs.project_id, "project_id")?;
        let tracker_id = required(attrs.tracker_id, "tracker_id")?;
        let status_id = required(attrs.status_id, "status_id")?;
        let sprint_id = attrs.sprint_id.flatten();
        let story_points = attrs.story_points.flatten();

        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        if !exists(&tx, CHECK_PROJECT_EXISTS_SQL, project_id)? {
            return Err(BacklogError::ProjectNotFound { id: project_id });
        }
        validate_references(&tx, attrs)?;

        let now_str = Timestamp::now().to_string();
        tx.execute(
            INSERT_STORY_SQL,
            params![
                project_id as i64,
                tracker_id as i64,
                status_id as i64,
                sprint_id.map(|id| id as i64),
                &subject,
                attrs.description.clone().flatten(),
                story_points,
                &now_str,
                &now_str
            ],
        )
        .db_context("Failed to insert story")?;
        let id = tx.last_insert_rowid() as u64;

        let today = today();
        let status = Some(status_id as i64);
        journal_story(&tx, id, HistoryAttribute::StatusId, today, status)?;
        let sprint = sprint_id.map(|s| s as i64);
        journal_story(&tx, id, HistoryAttribute::SprintId, today, sprint)?;
        let points = story_points.map(i64::from);
        journal_story(&tx, id, HistoryAttribute::StoryPoints, today, points)?;

        PositionIndex::insert_after(&mut StoryPositions::new(&tx), id, prev_id)?;

        let story = load_story(&tx, id)?.ok_or(BacklogError::StoryNotFound { id })?;
        tx.commit().db_context("Failed to commit transaction")?;

        log::info!("Created story {id} in project {project_id}");
        Ok(story)
    }

    /// Applies attribute changes and, when `reposition` is given, moves the
    /// story after the wrapped predecessor, all in one transaction.
    pub fn update_and_reposition(
        &mut self,
        story_id: u64,
        attrs: &StoryAttributes,
        reposition: Option<Option<u64>>,
    ) -> Result<Story> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let current =
            load_story(&tx, story_id)?.ok_or(BacklogError::StoryNotFound { id: story_id })?;

        if !attrs.is_empty() {
            validate_references(&tx, attrs)?;

            let tracker_id = attrs.tracker_id.unwrap_or(current.tracker_id);
            let status_id = attrs.status_id.unwrap_or(current.status_id);
            let sprint_id = attrs.sprint_id.unwrap_or(current.sprint_id);
            let subject = attrs.subject.clone().unwrap_or_else(|| current.subject.clone());
            let description = attrs
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone());
            let story_points = attrs.story_points.unwrap_or(current.story_points);

            tx.execute(
                UPDATE_STORY_SQL,
                params![
                    tracker_id as i64,
                    status_id as i64,
                    sprint_id.map(|id| id as i64),
                    &subject,
                    &description,
                    story_points,
                    Timestamp::now().to_string(),
                    story_id as i64
                ],
            )
            .db_context("Failed to update story")?;

            let today = today();
            let mut changes = Vec::new();
            if status_id != current.status_id {
                changes.push((HistoryAttribute::StatusId, Some(status_id as i64)));
            }
            if sprint_id != current.sprint_id {
                changes.push((HistoryAttribute::SprintId, sprint_id.map(|s| s as i64)));
            }
            if story_points != current.story_points {
                changes.push((HistoryAttribute::StoryPoints, story_points.map(i64::from)));
            }
            for (attribute, value) in changes {
                journal_story(&tx, story_id, attribute, today, value)?;
            }
        }

        if let Some(prev_id) = reposition {
            PositionIndex::insert_after(&mut StoryPositions::new(&tx), story_id, prev_id)?;
        }

        let story =
            load_story(&tx, story_id)?.ok_or(BacklogError::StoryNotFound { id: story_id })?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(story)
    }

    /// Detaches a story and re-inserts it after `prev_id` atomically.
    pub fn move_after(&mut self, story_id: u64, prev_id: Option<u64>) -> Result<Placement> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        let placement =
            PositionIndex::insert_after(&mut StoryPositions::new(&tx), story_id, prev_id)?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(placement)
    }

    /// Takes a story out of the ordered list; it then sorts after every
    /// positioned story.
    pub fn remove_from_list(&mut self, story_id: u64) -> Result<()> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")?;

        PositionIndex::detach(&mut StoryPositions::new(&tx), story_id)?;

        tx.commit().db_context("Failed to commit transaction")
    }

    /// Stories of the given trackers in a project updated after `since`,
    /// oldest update first.
    pub fn stories_updated_since(
        &self,
        project_id: u64,
        since: Timestamp,
        trackers: &[u64],
    ) -> Result<Vec<Story>> {
        let placeholders = vec!["?"; trackers.len()].join(", ");
        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories WHERE stories.project_id = ? \
             AND stories.tracker_id IN ({placeholders})"
        );

        let mut values = vec![Value::Integer(project_id as i64)];
        values.extend(trackers.iter().map(|id| Value::Integer(*id as i64)));

        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare query")?;
        let mut stories = stmt
            .query_map(params_from_iter(values.iter()), Self::build_story_from_row)
            .db_context("Failed to query stories")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch stories")?;

        // Stored timestamps vary in fractional precision, so compare parsed values.
        stories.retain(|story| story.updated_at > since);
        stories.sort_by_key(|story| (story.updated_at, story.id));
        Ok(stories)
    }
}

impl StoryFinder for super::Database {
    fn find_stories(&self, query: &StoryQuery) -> Result<Vec<Story>> {
        let sql = query.select_sql(STORY_COLUMNS);
        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare story query")?;

        let stories = stmt
            .query_map(params_from_iter(query.params.iter()), Self::build_story_from_row)
            .db_context("Failed to query stories")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch stories")?;
        Ok(stories)
    }

    fn count_stories(&self, query: &StoryQuery) -> Result<u64> {
        self.connection
            .query_row(
                &query.count_sql(),
                params_from_iter(query.params.iter()),
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count as u64)
            .db_context("Failed to count stories")
    }
}

fn load_story(connection: &Connection, story_id: u64) -> Result<Option<Story>> {
    let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE stories.id = ?1");
    connection
        .query_row(&sql, params![story_id as i64], super::Database::build_story_from_row)
        .optional()
        .db_context("Failed to get story")
}

fn journal_story(
    connection: &Connection,
    story_id: u64,
    attribute: HistoryAttribute,
    day: Date,
    value: Option<i64>,
) -> Result<()> {
    super::Database::journal(
        connection,
        "story",
        story_id,
        attribute.as_str(),
        day,
        value.map_or(Value::Null, Value::Integer),
    )
}

fn exists(connection: &Connection, sql: &str, id: u64) -> Result<bool> {
    connection
        .query_row(sql, params![id as i64], |row| row.get(0))
        .db_context("Failed to check existence")
}

/// Rejects references to statuses or sprints that do not exist.
fn validate_references(connection: &Connection, attrs: &StoryAttributes) -> Result<()> {
    if let Some(status_id) = attrs.status_id {
        if !exists(connection, CHECK_STATUS_EXISTS_SQL, status_id)? {
            return Err(BacklogError::invalid_input("status_id")
                .with_reason(format!("status {status_id} does not exist")));
        }
    }
    if let Some(Some(sprint_id)) = attrs.sprint_id {
        if !exists(connection, CHECK_SPRINT_EXISTS_SQL, sprint_id)? {
            return Err(BacklogError::invalid_input("sprint_id")
                .with_reason(format!("sprint {sprint_id} does not exist")));
        }
    }
    Ok(())
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| BacklogError::invalid_input(field).with_reason("is required"))
}

fn today() -> Date {
    Zoned::now().date()
}
