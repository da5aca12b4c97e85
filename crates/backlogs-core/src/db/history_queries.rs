//! Attribute journal: dated writes and day-indexed reads.

use jiff::civil::Date;
use rusqlite::{params, types::Value, OptionalExtension};

use crate::{
    collaborators::{HistoryAttribute, HistoryReader, TaskSource},
    error::{BacklogError, DatabaseResultExt, Result},
    models::Task,
};

const INSERT_JOURNAL_SQL: &str = "INSERT INTO attribute_journal (entity_kind, entity_id, attribute, changed_on, value) VALUES (?1, ?2, ?3, ?4, ?5)";
const SELECT_JOURNAL_SQL: &str = "SELECT changed_on, value FROM attribute_journal WHERE entity_kind = ?1 AND entity_id = ?2 AND attribute = ?3 AND changed_on <= ?4 ORDER BY changed_on, id";
const INSERT_TASK_SQL: &str = "INSERT INTO tasks (story_id, subject, status_id) VALUES (?1, ?2, ?3)";
const SELECT_TASK_STORY_SQL: &str = "SELECT story_id FROM tasks WHERE id = ?1";
const CHECK_STORY_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM stories WHERE id = ?1)";
const SELECT_TASKS_SQL: &str = "SELECT tasks.id, tasks.story_id, tasks.subject, tasks.status_id, COALESCE(issue_statuses.is_closed, 0) FROM tasks LEFT JOIN issue_statuses ON issue_statuses.id = tasks.status_id WHERE tasks.story_id = ?1 ORDER BY tasks.id";

const STORY_KIND: &str = "story";
const TASK_KIND: &str = "task";
const REMAINING_HOURS: &str = "remaining_hours";

impl super::Database {
    /// Journals a story attribute value effective from `day`.
    ///
    /// Writes made here do not reach a burndown cache; go through
    /// [`crate::Backlogs`] or invalidate the story afterwards.
    pub fn record_story_value(
        &mut self,
        story_id: u64,
        attribute: HistoryAttribute,
        day: Date,
        value: Option<i64>,
    ) -> Result<()> {
        Self::journal(
            &self.connection,
            STORY_KIND,
            story_id,
            attribute.as_str(),
            day,
            value.map_or(Value::Null, Value::Integer),
        )
    }

    /// Journals a task's remaining hours effective from `day` and returns
    /// the id of the task's story.
    pub fn record_task_hours(
        &mut self,
        task_id: u64,
        day: Date,
        hours: Option<f64>,
    ) -> Result<u64> {
        if let Some(hours) = hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(BacklogError::invalid_input("remaining_hours")
                    .with_reason(format!("{hours} is not a valid number of hours")));
            }
        }
        let story_id = self
            .connection
            .query_row(SELECT_TASK_STORY_SQL, params![task_id as i64], |row| {
                row.get::<_, i64>(0)
            })
            .optional()
            .db_context("Failed to look up task")?
            .ok_or_else(|| {
                BacklogError::invalid_input("task_id")
                    .with_reason(format!("task {task_id} does not exist"))
            })?;

        Self::journal(
            &self.connection,
            TASK_KIND,
            task_id,
            REMAINING_HOURS,
            day,
            hours.map_or(Value::Null, Value::Real),
        )?;
        Ok(story_id as u64)
    }

    /// Creates a child task of a story.
    pub fn create_task(&mut self, story_id: u64, subject: &str, status_id: u64) -> Result<Task> {
        let exists: bool = self
            .connection
            .query_row(CHECK_STORY_EXISTS_SQL, params![story_id as i64], |row| {
                row.get(0)
            })
            .db_context("Failed to check story existence")?;
        if !exists {
            return Err(BacklogError::StoryNotFound { id: story_id });
        }

        self.connection
            .execute(
                INSERT_TASK_SQL,
                params![story_id as i64, subject, status_id as i64],
            )
            .db_context("Failed to insert task")?;
        let id = self.connection.last_insert_rowid() as u64;

        let is_closed = crate::collaborators::StatusCatalog::status(self, status_id)?
            .is_some_and(|status| status.is_closed);

        Ok(Task {
            id,
            story_id,
            subject: subject.to_string(),
            status_id,
            is_closed,
        })
    }

    pub(super) fn journal(
        connection: &rusqlite::Connection,
        kind: &str,
        entity_id: u64,
        attribute: &str,
        day: Date,
        value: Value,
    ) -> Result<()> {
        connection
            .execute(
                INSERT_JOURNAL_SQL,
                params![kind, entity_id as i64, attribute, day.to_string(), value],
            )
            .db_context("Failed to journal attribute value")?;
        Ok(())
    }

    /// Value of an attribute on each of `days`: the latest journal entry
    /// dated on or before the day.
    fn values_on_days(
        &self,
        kind: &str,
        entity_id: u64,
        attribute: &str,
        days: &[Date],
    ) -> Result<Vec<Option<Value>>> {
        let Some(last_day) = days.iter().max() else {
            return Ok(Vec::new());
        };

        let mut stmt = self
            .connection
            .prepare(SELECT_JOURNAL_SQL)
            .db_context("Failed to prepare query")?;
        let entries = stmt
            .query_map(
                params![kind, entity_id as i64, attribute, last_day.to_string()],
                |row| {
                    let day = super::sprint_queries::parse_date(Some(row.get(0)?), 0)?;
                    Ok((day, row.get::<_, Value>(1)?))
                },
            )
            .db_context("Failed to query journal")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch journal")?;

        Ok(days
            .iter()
            .map(|day| {
                entries
                    .iter()
                    .rev()
                    .find(|(changed_on, _)| changed_on.is_some_and(|c| c <= *day))
                    .map(|(_, value)| value.clone())
                    .filter(|value| *value != Value::Null)
            })
            .collect())
    }
}

impl HistoryReader for super::Database {
    fn history_at(
        &self,
        story_id: u64,
        attribute: HistoryAttribute,
        days: &[Date],
    ) -> Result<Vec<Option<i64>>> {
        Ok(self
            .values_on_days(STORY_KIND, story_id, attribute.as_str(), days)?
            .into_iter()
            .map(|value| match value {
                Some(Value::Integer(i)) => Some(i),
                Some(Value::Real(r)) if r.fract() == 0.0 => Some(r as i64),
                _ => None,
            })
            .collect())
    }
}

impl TaskSource for super::Database {
    fn child_tasks(&self, story_id: u64) -> Result<Vec<Task>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_TASKS_SQL)
            .db_context("Failed to prepare query")?;
        let tasks = stmt
            .query_map(params![story_id as i64], |row| {
                Ok(Task {
                    id: row.get::<_, i64>(0)? as u64,
                    story_id: row.get::<_, i64>(1)? as u64,
                    subject: row.get(2)?,
                    status_id: row.get::<_, i64>(3)? as u64,
                    is_closed: row.get(4)?,
                })
            })
            .db_context("Failed to query tasks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch tasks")?;
        Ok(tasks)
    }

    fn remaining_hours(&self, task_id: u64, days: &[Date]) -> Result<Vec<Option<f64>>> {
        Ok(self
            .values_on_days(TASK_KIND, task_id, REMAINING_HOURS, days)?
            .into_iter()
            .map(|value| match value {
                Some(Value::Integer(i)) => Some(i as f64),
                Some(Value::Real(r)) => Some(r),
                _ => None,
            })
            .collect())
    }
}
