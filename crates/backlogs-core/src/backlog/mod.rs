//! High-level async API over ranked backlogs and burndowns.
//!
//! [`Backlogs`] is the facade the rest of an application talks to. Every
//! operation opens the SQLite store inside `tokio::task::spawn_blocking`,
//! runs the ranking or burndown engine against it and returns plain values.
//!
//! - [`builder`]: configures and validates a [`Backlogs`] instance
//! - [`story_ops`]: ranked lists, create/update/move and rank lookups
//! - [`burndown_ops`]: cached per-sprint burndown curves
//!
//! ```rust,no_run
//! use backlogs_core::{BacklogsBuilder, BacklogsConfig, BacklogScope};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backlogs = BacklogsBuilder::new()
//!     .with_database_path("backlogs.db")
//!     .with_config(BacklogsConfig::with_story_trackers([1]))
//!     .build()
//!     .await?;
//!
//! for entry in backlogs.backlog(&BacklogScope::project(1)).await? {
//!     println!("{:>3}. {}", entry.rank, entry.story.subject);
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    burndown::BurndownCache, config::BacklogsConfig, error::BacklogError,
    ranking::VisibilityPredicate,
};

pub mod builder;
pub mod burndown_ops;
pub mod story_ops;

#[cfg(test)]
mod tests;

pub use builder::BacklogsBuilder;

/// Main interface for ranked backlogs and sprint burndowns.
#[derive(Clone)]
pub struct Backlogs {
    pub(crate) db_path: PathBuf,
    pub(crate) config: Arc<BacklogsConfig>,
    pub(crate) visibility: Arc<dyn VisibilityPredicate>,
    pub(crate) cache: Arc<dyn BurndownCache>,
}

impl Backlogs {
    pub(crate) fn new(
        db_path: PathBuf,
        config: BacklogsConfig,
        visibility: Arc<dyn VisibilityPredicate>,
        cache: Arc<dyn BurndownCache>,
    ) -> Self {
        Self {
            db_path,
            config: Arc::new(config),
            visibility,
            cache,
        }
    }

    /// Path of the backing SQLite file.
    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// The configuration this instance was built with.
    pub fn config(&self) -> &BacklogsConfig {
        &self.config
    }
}

pub(crate) fn join_error(e: tokio::task::JoinError) -> BacklogError {
    BacklogError::Configuration {
        message: format!("Task join error: {e}"),
    }
}
