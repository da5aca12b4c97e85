//! Builder for creating and configuring Backlogs instances.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::task;

use super::{join_error, Backlogs};
use crate::{
    burndown::{BurndownCache, EvictionPolicy, MemoryBurndownCache},
    config::BacklogsConfig,
    db::Database,
    error::{BacklogError, Result},
    ranking::{AllVisible, VisibilityPredicate},
};

/// Builder for creating and configuring Backlogs instances.
#[derive(Clone, Default)]
pub struct BacklogsBuilder {
    database_path: Option<PathBuf>,
    config: BacklogsConfig,
    visibility: Option<Arc<dyn VisibilityPredicate>>,
    cache: Option<Arc<dyn BurndownCache>>,
}

impl BacklogsBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/backlogs/backlogs.db` or
    /// `~/.local/share/backlogs/backlogs.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_config(mut self, config: BacklogsConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the visibility predicate applied to every ranked query.
    /// Defaults to [`AllVisible`].
    pub fn with_visibility(mut self, visibility: Arc<dyn VisibilityPredicate>) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Replaces the burndown cache. Defaults to a [`MemoryBurndownCache`]
    /// sized by `cache_capacity`.
    pub fn with_cache(mut self, cache: Arc<dyn BurndownCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the configured instance.
    ///
    /// # Errors
    ///
    /// Returns `BacklogError::Configuration` if the configuration is invalid
    /// Returns `BacklogError::FileSystem` if the database path is invalid
    /// Returns `BacklogError::Database` if database initialization fails
    pub async fn build(self) -> Result<Backlogs> {
        self.config.validate()?;

        let db_path = if let Some(path) = self.database_path {
            path
        } else {
            Self::default_database_path()?
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BacklogError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let db_path_clone = db_path.clone();
        task::spawn_blocking(move || {
            let _db = Database::new(&db_path_clone)?;
            Ok::<(), BacklogError>(())
        })
        .await
        .map_err(join_error)??;

        let capacity = self.config.cache_capacity;
        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(MemoryBurndownCache::new(EvictionPolicy::with_capacity(capacity)))
                as Arc<dyn BurndownCache>
        });
        let visibility = self
            .visibility
            .unwrap_or_else(|| Arc::new(AllVisible) as Arc<dyn VisibilityPredicate>);

        log::debug!("Backlogs database at {}", db_path.display());
        Ok(Backlogs::new(db_path, self.config, visibility, cache))
    }

    /// Returns the default database path following XDG Base Directory
    /// specification.
    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("backlogs")
            .place_data_file("backlogs.db")
            .map_err(|e| BacklogError::XdgDirectory(e.to_string()))
    }
}
