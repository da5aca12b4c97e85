//! Backlog configuration passed explicitly to every component that needs it.

use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{BacklogError, Result};

/// Default number of burndown entries kept by the in-memory cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Settings that decide which issues are stories and how sprints are judged.
///
/// Built once at startup (directly or from a JSON file) and handed to
/// [`crate::BacklogsBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacklogsConfig {
    /// Tracker ids whose issues are stories
    pub story_trackers: BTreeSet<u64>,

    /// Status ids that count as accepted when a sprint defines none
    pub success_statuses: BTreeSet<u64>,

    /// Exclude Saturdays and Sundays from a sprint's active window
    pub skip_weekends: bool,

    /// Maximum burndown entries kept in memory; 0 disables caching
    pub cache_capacity: usize,
}

impl Default for BacklogsConfig {
    fn default() -> Self {
        Self {
            story_trackers: BTreeSet::new(),
            success_statuses: BTreeSet::new(),
            skip_weekends: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl BacklogsConfig {
    /// Creates a configuration recognizing the given story trackers.
    pub fn with_story_trackers(trackers: impl IntoIterator<Item = u64>) -> Self {
        Self {
            story_trackers: trackers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Reads a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| BacklogError::FileSystem {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that cannot produce any story.
    pub fn validate(&self) -> Result<()> {
        if self.story_trackers.is_empty() {
            return Err(BacklogError::configuration(
                "at least one story tracker must be configured",
            ));
        }
        Ok(())
    }

    /// Whether issues of this tracker are stories.
    pub fn is_story_tracker(&self, tracker_id: u64) -> bool {
        self.story_trackers.contains(&tracker_id)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_from_json_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "story_trackers": [2, 5], "skip_weekends": true }}"#).unwrap();

        let config = BacklogsConfig::from_json_file(file.path()).unwrap();
        assert!(config.is_story_tracker(2));
        assert!(config.is_story_tracker(5));
        assert!(!config.is_story_tracker(3));
        assert!(config.skip_weekends);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_validate_requires_story_trackers() {
        let err = BacklogsConfig::default().validate().unwrap_err();
        assert!(matches!(err, BacklogError::Configuration { .. }));
    }

    #[test]
    fn test_missing_file_is_file_system_error() {
        let err = BacklogsConfig::from_json_file("/nonexistent/backlogs.json").unwrap_err();
        assert!(matches!(err, BacklogError::FileSystem { .. }));
    }
}
