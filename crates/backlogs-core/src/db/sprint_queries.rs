//! Projects, workflow statuses and sprints.

use std::collections::BTreeSet;

use jiff::civil::Date;
use rusqlite::{params, types::Type, OptionalExtension};

use crate::{
    collaborators::StatusCatalog,
    error::{BacklogError, DatabaseResultExt, Result},
    models::{IssueStatus, Sprint, SprintStatus},
    ranking::{BacklogScope, ResolvedScope, SprintSelector},
};

const INSERT_PROJECT_SQL: &str =
    "INSERT INTO projects (parent_id, name, is_public) VALUES (?1, ?2, ?3)";
const CHECK_PROJECT_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)";
const INSERT_STATUS_SQL: &str = "INSERT INTO issue_statuses (name, is_closed) VALUES (?1, ?2)";
const SELECT_STATUS_SQL: &str = "SELECT id, name, is_closed FROM issue_statuses WHERE id = ?1";
const INSERT_SPRINT_SQL: &str = "INSERT INTO sprints (project_id, name, status, start_date, end_date) VALUES (?1, ?2, ?3, ?4, ?5)";
const SELECT_SPRINT_SQL: &str =
    "SELECT id, project_id, name, status, start_date, end_date FROM sprints WHERE id = ?1";
const SELECT_SPRINT_SUCCESS_SQL: &str =
    "SELECT status_id FROM sprint_success_statuses WHERE sprint_id = ?1 ORDER BY status_id";
const DELETE_SPRINT_SUCCESS_SQL: &str = "DELETE FROM sprint_success_statuses WHERE sprint_id = ?1";
const INSERT_SPRINT_SUCCESS_SQL: &str =
    "INSERT INTO sprint_success_statuses (sprint_id, status_id) VALUES (?1, ?2)";
const UPDATE_SPRINT_STATUS_SQL: &str = "UPDATE sprints SET status = ?1 WHERE id = ?2";
const SELECT_OPEN_SPRINTS_SQL: &str =
    "SELECT id FROM sprints WHERE project_id = ?1 AND status = 'open' ORDER BY start_date, id";

/// Fields of a new sprint.
#[derive(Debug, Clone, Default)]
pub struct NewSprint {
    pub project_id: u64,
    pub name: String,
    pub status: SprintStatus,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl super::Database {
    /// Creates a project, optionally below a parent.
    pub fn create_project(
        &mut self,
        name: &str,
        parent_id: Option<u64>,
        is_public: bool,
    ) -> Result<u64> {
        self.connection
            .execute(
                INSERT_PROJECT_SQL,
                params![parent_id.map(|id| id as i64), name, is_public],
            )
            .db_context("Failed to insert project")?;
        Ok(self.connection.last_insert_rowid() as u64)
    }

    pub fn project_exists(&self, project_id: u64) -> Result<bool> {
        self.connection
            .query_row(CHECK_PROJECT_EXISTS_SQL, params![project_id as i64], |row| {
                row.get(0)
            })
            .db_context("Failed to check project existence")
    }

    /// Creates a workflow status.
    pub fn create_status(&mut self, name: &str, is_closed: bool) -> Result<IssueStatus> {
        self.connection
            .execute(INSERT_STATUS_SQL, params![name, is_closed])
            .db_context("Failed to insert status")?;
        Ok(IssueStatus {
            id: self.connection.last_insert_rowid() as u64,
            name: name.to_string(),
            is_closed,
        })
    }

    /// Creates a sprint with an empty acceptance predicate.
    pub fn create_sprint(&mut self, sprint: &NewSprint) -> Result<Sprint> {
        if !self.project_exists(sprint.project_id)? {
            return Err(BacklogError::ProjectNotFound {
                id: sprint.project_id,
            });
        }

        self.connection
            .execute(
                INSERT_SPRINT_SQL,
                params![
                    sprint.project_id as i64,
                    &sprint.name,
                    sprint.status.as_str(),
                    sprint.start_date.map(|d| d.to_string()),
                    sprint.end_date.map(|d| d.to_string()),
                ],
            )
            .db_context("Failed to insert sprint")?;

        Ok(Sprint {
            id: self.connection.last_insert_rowid() as u64,
            project_id: sprint.project_id,
            name: sprint.name.clone(),
            status: sprint.status,
            start_date: sprint.start_date,
            end_date: sprint.end_date,
            success_statuses: BTreeSet::new(),
        })
    }

    /// Replaces the statuses that count as accepted in a sprint.
    pub fn set_sprint_success_statuses(
        &mut self,
        sprint_id: u64,
        status_ids: &[u64],
    ) -> Result<()> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        tx.execute(DELETE_SPRINT_SUCCESS_SQL, params![sprint_id as i64])
            .db_context("Failed to clear sprint acceptance")?;
        for status_id in status_ids {
            tx.execute(
                INSERT_SPRINT_SUCCESS_SQL,
                params![sprint_id as i64, *status_id as i64],
            )
            .db_context("Failed to insert sprint acceptance")?;
        }

        tx.commit().db_context("Failed to commit transaction")
    }

    pub fn set_sprint_status(&mut self, sprint_id: u64, status: SprintStatus) -> Result<()> {
        let changed = self
            .connection
            .execute(UPDATE_SPRINT_STATUS_SQL, params![status.as_str(), sprint_id as i64])
            .db_context("Failed to update sprint status")?;
        if changed == 0 {
            return Err(BacklogError::SprintNotFound { id: sprint_id });
        }
        Ok(())
    }

    /// Retrieves a sprint with its acceptance predicate.
    pub fn get_sprint(&self, sprint_id: u64) -> Result<Option<Sprint>> {
        let sprint = self
            .connection
            .query_row(SELECT_SPRINT_SQL, params![sprint_id as i64], |row| {
                let status_str: String = row.get(3)?;
                let status = status_str.parse::<SprintStatus>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
                })?;

                Ok(Sprint {
                    id: row.get::<_, i64>(0)? as u64,
                    project_id: row.get::<_, i64>(1)? as u64,
                    name: row.get(2)?,
                    status,
                    start_date: parse_date(row.get(4)?, 4)?,
                    end_date: parse_date(row.get(5)?, 5)?,
                    success_statuses: BTreeSet::new(),
                })
            })
            .optional()
            .db_context("Failed to query sprint")?;

        let Some(mut sprint) = sprint else {
            return Ok(None);
        };

        let mut stmt = self
            .connection
            .prepare(SELECT_SPRINT_SUCCESS_SQL)
            .db_context("Failed to prepare query")?;
        sprint.success_statuses = stmt
            .query_map(params![sprint_id as i64], |row| {
                row.get::<_, i64>(0).map(|id| id as u64)
            })
            .db_context("Failed to query sprint acceptance")?
            .collect::<std::result::Result<_, _>>()
            .db_context("Failed to fetch sprint acceptance")?;

        Ok(Some(sprint))
    }

    /// Ids of a project's open sprints, earliest first.
    pub fn open_sprint_ids(&self, project_id: u64) -> Result<Vec<u64>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_OPEN_SPRINTS_SQL)
            .db_context("Failed to prepare query")?;
        let ids = stmt
            .query_map(params![project_id as i64], |row| {
                row.get::<_, i64>(0).map(|id| id as u64)
            })
            .db_context("Failed to query open sprints")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch open sprints")?;
        Ok(ids)
    }
}

impl StatusCatalog for super::Database {
    fn status(&self, status_id: u64) -> Result<Option<IssueStatus>> {
        self.connection
            .query_row(SELECT_STATUS_SQL, params![status_id as i64], |row| {
                Ok(IssueStatus {
                    id: row.get::<_, i64>(0)? as u64,
                    name: row.get(1)?,
                    is_closed: row.get(2)?,
                })
            })
            .optional()
            .db_context("Failed to query status")
    }
}

/// Parses an optional ISO date column.
pub(super) fn parse_date(value: Option<String>, column: usize) -> rusqlite::Result<Option<Date>> {
    value
        .map(|raw| {
            raw.parse::<Date>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
            })
        })
        .transpose()
}

impl super::Database {
    /// Turns a scope's sprint selector into concrete sprint ids.
    ///
    /// `SprintSelector::Open` needs the scope's project to find its open
    /// sprints.
    pub fn resolve_scope(&self, scope: &BacklogScope) -> Result<ResolvedScope> {
        let sprint_ids = match &scope.sprints {
            None => None,
            Some(SprintSelector::Ids(ids)) => Some(ids.clone()),
            Some(SprintSelector::Open) => {
                let project_id = scope.project_id.ok_or_else(|| {
                    BacklogError::configuration("Open sprints require a project id")
                })?;
                Some(self.open_sprint_ids(project_id)?)
            }
        };

        Ok(ResolvedScope {
            project_id: scope.project_id,
            sprint_ids,
            include_backlog: scope.include_backlog,
            limit: scope.limit,
        })
    }
}
