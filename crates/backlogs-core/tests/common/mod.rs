#![allow(dead_code)]

use std::path::Path;

use backlogs_core::{
    db::sprint_queries::NewSprint, BacklogsBuilder, BacklogsConfig, Database, IssueStatus,
    Sprint, SprintStatus,
};
use jiff::civil::Date;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

pub const STORY_TRACKER: u64 = 1;
pub const OTHER_TRACKER: u64 = 7;

/// Projects and statuses every test starts from.
pub struct Fixture {
    pub project_id: u64,
    pub open: IssueStatus,
    pub done: IssueStatus,
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config() -> BacklogsConfig {
    BacklogsConfig::with_story_trackers([STORY_TRACKER])
}

/// Helper function to create a test instance with a seeded database
pub async fn create_test_backlogs(
    config: BacklogsConfig,
) -> (TempDir, backlogs_core::Backlogs, Fixture) {
    init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let fixture = seed(&db_path);
    let backlogs = BacklogsBuilder::new()
        .with_database_path(&db_path)
        .with_config(config)
        .build()
        .await
        .expect("Failed to create backlogs");
    (temp_dir, backlogs, fixture)
}

pub fn seed(path: &Path) -> Fixture {
    let mut db = Database::new(path).expect("Failed to open database");
    let project_id = db
        .create_project("Webshop", None, true)
        .expect("Failed to create project");
    let open = db.create_status("New", false).expect("Failed to create status");
    let done = db.create_status("Done", true).expect("Failed to create status");
    Fixture {
        project_id,
        open,
        done,
    }
}

pub fn story_attributes(fixture: &Fixture, subject: &str) -> Map<String, Value> {
    let value = json!({
        "subject": subject,
        "project_id": fixture.project_id,
        "tracker_id": STORY_TRACKER,
        "status_id": fixture.open.id,
    });
    value.as_object().cloned().expect("attributes are an object")
}

pub fn date(y: i16, m: i8, d: i8) -> Date {
    jiff::civil::date(y, m, d)
}

pub fn create_sprint(db: &mut Database, project_id: u64, start: Date, end: Date) -> Sprint {
    db.create_sprint(&NewSprint {
        project_id,
        name: "Sprint 1".to_string(),
        status: SprintStatus::Open,
        start_date: Some(start),
        end_date: Some(end),
    })
    .expect("Failed to create sprint")
}
