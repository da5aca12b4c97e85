//! Position store over every stored story, bound to a transaction.
//!
//! Positions form one sequence across projects. Ranked lists may span a
//! project tree or several sprints, and any list is a subsequence of this
//! one, so relative order inside a list never depends on which projects it
//! covers.

use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    error::{DatabaseResultExt, Result},
    ranking::PositionStore,
};

const SELECT_POSITION_SQL: &str = "SELECT position FROM stories WHERE id = ?1";
const SELECT_POSITION_BOUNDS_SQL: &str = "SELECT MIN(position), MAX(position) FROM stories";
const SHIFT_POSITIONS_SQL: &str =
    "UPDATE stories SET position = position + ?1 WHERE position >= ?2";
const UPDATE_POSITION_SQL: &str = "UPDATE stories SET position = ?1 WHERE id = ?2";

/// The ordered story set. Every call runs on the borrowed connection, so
/// wrapping its use in a transaction makes a move atomic.
pub struct StoryPositions<'c> {
    connection: &'c Connection,
}

impl<'c> StoryPositions<'c> {
    pub fn new(connection: &'c Connection) -> Self {
        Self { connection }
    }
}

impl PositionStore for StoryPositions<'_> {
    fn position_of(&mut self, id: u64) -> Result<Option<Option<i64>>> {
        self.connection
            .query_row(SELECT_POSITION_SQL, params![id as i64], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()
            .db_context("Failed to query story position")
    }

    fn position_bounds(&mut self) -> Result<Option<(i64, i64)>> {
        let (min, max): (Option<i64>, Option<i64>) = self
            .connection
            .query_row(SELECT_POSITION_BOUNDS_SQL, [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .db_context("Failed to query position bounds")?;
        Ok(min.zip(max))
    }

    fn shift_from(&mut self, from: i64, delta: i64) -> Result<()> {
        self.connection
            .execute(SHIFT_POSITIONS_SQL, params![delta, from])
            .db_context("Failed to shift story positions")?;
        Ok(())
    }

    fn set_position(&mut self, id: u64, position: Option<i64>) -> Result<()> {
        self.connection
            .execute(UPDATE_POSITION_SQL, params![position, id as i64])
            .db_context("Failed to update story position")?;
        Ok(())
    }
}
