//! SQLite storage implementing the collaborator interfaces.
//!
//! This module owns the reference store for projects, sprints, statuses,
//! stories, tasks and the attribute journal the burndown reads from. It is
//! split by concern:
//!
//! - [`migrations`]: schema setup
//! - [`story_queries`]: ranked story queries, creation, updates, moves
//! - [`sprint_queries`]: projects, statuses and sprints
//! - [`history_queries`]: the attribute journal and day-indexed reads
//! - [`positions`]: the position store used inside move transactions

use std::path::Path;

use rusqlite::Connection;

use crate::error::{DatabaseResultExt, Result};

pub mod history_queries;
pub mod migrations;
pub mod positions;
pub mod sprint_queries;
pub mod story_queries;

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Creates a new database connection and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().db_context("Failed to open in-memory database")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }
}
