//! Scope-to-query translation for ranked story lists.

use std::collections::BTreeSet;

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use super::position::ORDER_CLAUSE;
use crate::error::{BacklogError, Result};

/// A boolean SQL fragment with its positional (`?`) parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A fragment matching every row.
    pub fn always() -> Self {
        Self::new("1 = 1", Vec::new())
    }

    /// Joins fragments with `op`, parenthesizing each one. Parameters keep
    /// fragment order.
    fn combine(fragments: Vec<Fragment>, op: &str) -> Option<Fragment> {
        if fragments.is_empty() {
            return None;
        }
        let mut params = Vec::new();
        let sql = fragments
            .into_iter()
            .map(|fragment| {
                params.extend(fragment.params);
                format!("({})", fragment.sql)
            })
            .collect::<Vec<_>>()
            .join(op);
        Some(Fragment { sql, params })
    }
}

/// Tables joined onto `stories` by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Join {
    Project,
    Status,
}

impl Join {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Join::Project => "JOIN projects ON projects.id = stories.project_id",
            Join::Status => "JOIN issue_statuses ON issue_statuses.id = stories.status_id",
        }
    }
}

/// Which sprints a scope covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum SprintSelector {
    /// Explicit sprint ids
    Ids(Vec<u64>),
    /// Every open sprint of the scope's project
    Open,
}

/// Project and/or sprint constraint narrowing which stories a query sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct BacklogScope {
    /// Project whose product backlog is included
    pub project_id: Option<u64>,
    /// Sprints whose stories are included
    pub sprints: Option<SprintSelector>,
    /// Keep the project backlog alongside the sprints
    #[serde(default)]
    pub include_backlog: bool,
    /// Maximum number of stories returned
    pub limit: Option<u64>,
}

impl BacklogScope {
    /// The product backlog of a project.
    pub fn project(project_id: u64) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::default()
        }
    }

    /// The backlog of one sprint.
    pub fn sprint(sprint_id: u64) -> Self {
        Self::sprints(vec![sprint_id])
    }

    /// The backlogs of several sprints.
    pub fn sprints(sprint_ids: Vec<u64>) -> Self {
        Self {
            sprints: Some(SprintSelector::Ids(sprint_ids)),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }
}

/// A scope whose sprint selector has been turned into concrete ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedScope {
    pub project_id: Option<u64>,
    pub sprint_ids: Option<Vec<u64>>,
    pub include_backlog: bool,
    pub limit: Option<u64>,
}

/// What a visibility predicate is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityTarget {
    Project(u64),
    Sprint(u64),
}

/// Source of the visibility filter applied to every story query.
pub trait VisibilityPredicate: Send + Sync {
    fn condition(&self, target: VisibilityTarget, with_subprojects: bool) -> Fragment;
}

/// Every story is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllVisible;

impl VisibilityPredicate for AllVisible {
    fn condition(&self, _target: VisibilityTarget, _with_subprojects: bool) -> Fragment {
        Fragment::always()
    }
}

/// Only stories of public projects are visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicProjects;

impl VisibilityPredicate for PublicProjects {
    fn condition(&self, _target: VisibilityTarget, _with_subprojects: bool) -> Fragment {
        Fragment::new("projects.is_public = 1", Vec::new())
    }
}

/// Executable description of a ranked story query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryQuery {
    pub joins: BTreeSet<Join>,
    pub filter: String,
    pub params: Vec<Value>,
    pub order: &'static str,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl StoryQuery {
    /// `SELECT` statement for the given column list, in rank order.
    pub fn select_sql(&self, columns: &str) -> String {
        let mut sql = format!("SELECT {columns} FROM stories");
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.as_sql());
        }
        sql.push_str(" WHERE ");
        sql.push_str(&self.filter);
        sql.push_str(" ORDER BY ");
        sql.push_str(self.order);
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
        sql
    }

    /// `SELECT COUNT(*)` over the same rows, ignoring limit and offset.
    pub fn count_sql(&self) -> String {
        let mut sql = "SELECT COUNT(*) FROM stories".to_string();
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.as_sql());
        }
        sql.push_str(" WHERE ");
        sql.push_str(&self.filter);
        sql
    }

    /// Restricts the query to a single row at a 1-based rank.
    pub fn at_rank(mut self, rank: u64) -> Self {
        self.limit = Some(1);
        self.offset = Some(rank.saturating_sub(1));
        self
    }
}

/// Builds [`StoryQuery`] values for a tracker set and visibility source.
pub struct RankQuery<'a> {
    trackers: &'a BTreeSet<u64>,
    visibility: &'a dyn VisibilityPredicate,
}

impl<'a> RankQuery<'a> {
    pub fn new(trackers: &'a BTreeSet<u64>, visibility: &'a dyn VisibilityPredicate) -> Self {
        Self {
            trackers,
            visibility,
        }
    }

    /// Translates a resolved scope plus caller filters into a query.
    ///
    /// Sprint scope wins over project scope unless the backlog is included.
    /// Caller filters are ANDed on and their parameters follow the scope's.
    pub fn build(&self, scope: &ResolvedScope, filters: &[Fragment]) -> Result<StoryQuery> {
        let sprint_ids = scope.sprint_ids.as_deref();
        let project_id = match (scope.project_id, sprint_ids) {
            (Some(_), Some(_)) if !scope.include_backlog => None,
            (project_id, _) => project_id,
        };

        if project_id.is_none() && sprint_ids.is_none() {
            return Err(BacklogError::configuration(
                "Specify either sprint or project id",
            ));
        }

        let mut joins = BTreeSet::from([Join::Project]);
        let mut scopes = Vec::new();
        let mut visible = Vec::new();

        if let Some(project_id) = project_id {
            joins.insert(Join::Status);
            let mut params = self.tracker_params();
            params.push(Value::Integer(0));
            params.push(Value::Integer(project_id as i64));
            scopes.push(Fragment::new(
                format!(
                    "stories.tracker_id IN ({}) AND stories.sprint_id IS NULL \
                     AND issue_statuses.is_closed = ? AND stories.project_id IN ({})",
                    self.tracker_placeholders(),
                    SUBPROJECTS_SQL
                ),
                params,
            ));
        }

        if let Some(sprint_ids) = sprint_ids {
            let mut params = self.tracker_params();
            params.extend(sprint_ids.iter().map(|id| Value::Integer(*id as i64)));
            scopes.push(Fragment::new(
                format!(
                    "stories.tracker_id IN ({}) AND stories.sprint_id IN ({})",
                    self.tracker_placeholders(),
                    placeholders(sprint_ids.len())
                ),
                params,
            ));
            visible.extend(sprint_ids.iter().map(|id| {
                self.visibility
                    .condition(VisibilityTarget::Sprint(*id), true)
            }));
        }

        if let Some(project_id) = project_id {
            visible.push(
                self.visibility
                    .condition(VisibilityTarget::Project(project_id), true),
            );
        }

        let mut parts: Vec<Fragment> = Fragment::combine(scopes, " OR ").into_iter().collect();
        parts.extend(Fragment::combine(visible, " OR "));
        parts.extend(filters.iter().cloned());

        let Fragment { sql, params } =
            Fragment::combine(parts, " AND ").unwrap_or_else(Fragment::always);

        log::debug!("Built story query: {sql} ({} params)", params.len());

        Ok(StoryQuery {
            joins,
            filter: sql,
            params,
            order: ORDER_CLAUSE,
            limit: scope.limit,
            offset: None,
        })
    }

    /// Open stories of exactly one project, whatever sprint they are in.
    /// Sub-projects are not included.
    pub fn open_in_project(&self, project_id: u64) -> StoryQuery {
        let mut params = vec![Value::Integer(project_id as i64)];
        params.extend(self.tracker_params());
        params.push(Value::Integer(0));
        let scope = Fragment::new(
            format!(
                "stories.project_id = ? AND stories.tracker_id IN ({}) \
                 AND issue_statuses.is_closed = ?",
                self.tracker_placeholders()
            ),
            params,
        );
        let visible = self
            .visibility
            .condition(VisibilityTarget::Project(project_id), false);

        let Fragment { sql, params } =
            Fragment::combine(vec![scope, visible], " AND ").unwrap_or_else(Fragment::always);

        StoryQuery {
            joins: BTreeSet::from([Join::Project, Join::Status]),
            filter: sql,
            params,
            order: ORDER_CLAUSE,
            limit: None,
            offset: None,
        }
    }

    fn tracker_params(&self) -> Vec<Value> {
        self.trackers
            .iter()
            .map(|id| Value::Integer(*id as i64))
            .collect()
    }

    fn tracker_placeholders(&self) -> String {
        placeholders(self.trackers.len())
    }
}

/// A project and every descendant of it; binds one parameter.
const SUBPROJECTS_SQL: &str = "WITH RECURSIVE subprojects(id) AS (SELECT ? \
     UNION ALL SELECT projects.id FROM projects \
     JOIN subprojects ON projects.parent_id = subprojects.id) \
     SELECT id FROM subprojects";

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
