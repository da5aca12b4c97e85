//! Error types for the backlogs library.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for all backlog, ranking and burndown operations.
#[derive(Error, Debug)]
pub enum BacklogError {
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// Story not found for the given ID
    #[error("Story with ID {id} not found")]
    StoryNotFound { id: u64 },
    /// Sprint not found for the given ID
    #[error("Sprint with ID {id} not found")]
    SprintNotFound { id: u64 },
    /// Project not found for the given ID
    #[error("Project with ID {id} not found")]
    ProjectNotFound { id: u64 },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Attribute value outside its accepted domain
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Unsupported scope or broken configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> BacklogError {
        BacklogError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> BacklogError {
        BacklogError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl BacklogError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Creates a configuration error from any message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::StoryNotFound { .. } | Self::SprintNotFound { .. } | Self::ProjectNotFound { .. }
        )
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| BacklogError::database(message).with_source(e))
    }
}

/// Result type alias for backlog operations
pub type Result<T> = std::result::Result<T, BacklogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_builder() {
        let err = BacklogError::invalid_input("story_points").with_reason("must not be negative");
        assert_eq!(
            err.to_string(),
            "Invalid input for field 'story_points': must not be negative"
        );
    }

    #[test]
    fn test_not_found_family() {
        assert!(BacklogError::StoryNotFound { id: 1 }.is_not_found());
        assert!(BacklogError::SprintNotFound { id: 1 }.is_not_found());
        assert!(!BacklogError::configuration("no scope").is_not_found());
    }

    #[test]
    fn test_db_context_wraps_source() {
        let res: std::result::Result<(), rusqlite::Error> =
            Err(rusqlite::Error::QueryReturnedNoRows);
        let err = res.db_context("Failed to load story").unwrap_err();
        assert!(matches!(err, BacklogError::Database { .. }));
        assert_eq!(err.to_string(), "Database error: Failed to load story");
    }
}
