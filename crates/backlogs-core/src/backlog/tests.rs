//! Tests for the backlog facade.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::{
    burndown::{EvictionPolicy, MemoryBurndownCache},
    db::Database,
    params::{CreateStory, Id, Reposition},
    ranking::BacklogScope,
};

/// Helper function to create test backlogs with one project and status
async fn create_test_backlogs(config: BacklogsConfig) -> (TempDir, Backlogs, u64, u64) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let (project_id, status_id) = {
        let mut db = Database::new(&db_path).expect("Failed to open database");
        let project_id = db.create_project("Shop", None, true).unwrap();
        let status = db.create_status("New", false).unwrap();
        (project_id, status.id)
    };
    let backlogs = BacklogsBuilder::new()
        .with_database_path(&db_path)
        .with_config(config)
        .build()
        .await
        .expect("Failed to create backlogs");
    (temp_dir, backlogs, project_id, status_id)
}

fn create_params(project_id: u64, status_id: u64, subject: &str) -> CreateStory {
    let attributes = json!({
        "subject": subject,
        "project_id": project_id,
        "tracker_id": 1,
        "status_id": status_id,
    });
    CreateStory {
        attributes: attributes.as_object().cloned().unwrap(),
        prev_id: None,
    }
}

#[tokio::test]
async fn test_builder_keeps_config() {
    let mut config = BacklogsConfig::with_story_trackers([1, 2]);
    config.skip_weekends = true;
    let (_temp_dir, backlogs, _, _) = create_test_backlogs(config.clone()).await;

    assert_eq!(backlogs.config(), &config);
    assert!(backlogs.database_path().exists());
}

#[tokio::test]
async fn test_builder_uses_supplied_cache() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(MemoryBurndownCache::new(EvictionPolicy::Disabled));
    let backlogs = BacklogsBuilder::new()
        .with_database_path(temp_dir.path().join("nested/dir/test.db"))
        .with_config(BacklogsConfig::with_story_trackers([1]))
        .with_cache(cache.clone())
        .build()
        .await
        .unwrap();

    assert!(backlogs.database_path().exists());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_create_then_fetch() {
    let (_temp_dir, backlogs, project_id, status_id) =
        create_test_backlogs(BacklogsConfig::with_story_trackers([1])).await;

    let story = backlogs
        .create_and_position(&create_params(project_id, status_id, "Login"))
        .await
        .unwrap();
    let fetched = backlogs.get_story(&Id { id: story.id }).await.unwrap();
    assert_eq!(fetched, Some(story));

    assert!(backlogs.get_story(&Id { id: 999 }).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_story_update_is_not_found() {
    let (_temp_dir, backlogs, _, _) =
        create_test_backlogs(BacklogsConfig::with_story_trackers([1])).await;

    let err = backlogs
        .update_and_reposition(&crate::params::UpdateStory {
            id: 77,
            attributes: serde_json::Map::new(),
            reposition: Some(Reposition::Top),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BacklogError::StoryNotFound { id: 77 }));
}

#[tokio::test]
async fn test_rank_of_other_tracker_is_none() {
    let (_temp_dir, backlogs, project_id, status_id) =
        create_test_backlogs(BacklogsConfig::with_story_trackers([1])).await;
    let story = backlogs
        .create_and_position(&create_params(project_id, status_id, "Login"))
        .await
        .unwrap();

    let narrowed = Backlogs {
        config: Arc::new(BacklogsConfig::with_story_trackers([5])),
        ..backlogs.clone()
    };
    assert_eq!(narrowed.rank_of(&Id { id: story.id }).await.unwrap(), None);
    assert!(narrowed
        .backlog(&BacklogScope::project(project_id))
        .await
        .unwrap()
        .is_empty());
}

#[test]
fn test_reposition_predecessor() {
    assert_eq!(Reposition::Top.predecessor(), None);
    assert_eq!(Reposition::After(4).predecessor(), Some(4));
}
