#[cfg(test)]
mod model_tests {
    use std::collections::BTreeSet;

    use jiff::{civil::date, Timestamp};
    use serde_json::json;

    use crate::{
        error::BacklogError,
        models::{
            attributes::{CREATE_EXCLUDED_FIELDS, UPDATE_EXCLUDED_FIELDS},
            parse_points, points_display, IssueStatus, RankedStory, Sprint, SprintStatus, Story,
            StoryAttributes, Task, TaskStatusCounts,
        },
    };

    fn create_test_story(id: u64, position: Option<i64>) -> Story {
        Story {
            id,
            project_id: 1,
            tracker_id: 2,
            status_id: 1,
            is_closed: false,
            sprint_id: None,
            subject: format!("Story {id}"),
            description: None,
            story_points: Some(3),
            position,
            created_at: Timestamp::from_second(1640995200).unwrap(),
            updated_at: Timestamp::from_second(1641081600).unwrap(),
        }
    }

    fn create_test_sprint() -> Sprint {
        Sprint {
            id: 7,
            project_id: 1,
            name: "Sprint 7".to_string(),
            status: SprintStatus::Open,
            start_date: Some(date(2024, 3, 1)),
            end_date: Some(date(2024, 3, 7)),
            success_statuses: BTreeSet::new(),
        }
    }

    #[test]
    fn test_parse_points() {
        assert_eq!(parse_points("").unwrap(), None);
        assert_eq!(parse_points(" - ").unwrap(), None);
        assert_eq!(parse_points("s").unwrap(), Some(0));
        assert_eq!(parse_points("S").unwrap(), Some(0));
        assert_eq!(parse_points("13").unwrap(), Some(13));
        assert!(matches!(
            parse_points("-2"),
            Err(BacklogError::InvalidInput { .. })
        ));
        assert!(parse_points("many").is_err());
    }

    #[test]
    fn test_points_display() {
        assert_eq!(points_display(None, "-"), "-");
        assert_eq!(points_display(Some(0), "-"), "S");
        assert_eq!(points_display(Some(8), "-"), "8");
        assert_eq!(create_test_story(1, None).points_display("?"), "3");
    }

    #[test]
    fn test_story_in_list() {
        assert!(create_test_story(1, Some(4)).in_list());
        assert!(!create_test_story(1, None).in_list());
    }

    #[test]
    fn test_ranked_story_numbering_is_one_based() {
        let ranked = RankedStory::number(vec![
            create_test_story(12, Some(1)),
            create_test_story(11, Some(2)),
            create_test_story(10, None),
        ]);
        let ranks: Vec<_> = ranked.iter().map(|r| (r.story.id, r.rank)).collect();
        assert_eq!(ranks, vec![(12, 1), (11, 2), (10, 3)]);
    }

    #[test]
    fn test_ranked_story_serializes_flat() {
        let ranked = RankedStory::number(vec![create_test_story(5, Some(1))]);
        let value = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(value["rank"], 1);
        assert_eq!(value["id"], 5);
        assert_eq!(value["position"], 1);
    }

    #[test]
    fn test_sprint_days_inclusive() {
        let days = create_test_sprint().days(false);
        assert_eq!(days.len(), 7);
        assert_eq!(days.first(), Some(&date(2024, 3, 1)));
        assert_eq!(days.last(), Some(&date(2024, 3, 7)));
    }

    #[test]
    fn test_sprint_days_skip_weekends() {
        // 2024-03-02 and 2024-03-03 are a Saturday and a Sunday
        let days = create_test_sprint().days(true);
        assert_eq!(days.len(), 5);
        assert!(!days.contains(&date(2024, 3, 2)));
        assert!(!days.contains(&date(2024, 3, 3)));
    }

    #[test]
    fn test_sprint_without_dates_has_no_burndown() {
        let mut sprint = create_test_sprint();
        sprint.end_date = None;
        assert!(!sprint.has_burndown());
        assert!(sprint.days(false).is_empty());
    }

    #[test]
    fn test_sprint_acceptance_falls_back_to_default() {
        let mut sprint = create_test_sprint();
        let done = IssueStatus {
            id: 5,
            name: "Done".to_string(),
            is_closed: true,
        };
        let defaults: BTreeSet<u64> = [5].into_iter().collect();
        assert!(sprint.accepts(&done, &defaults));

        sprint.success_statuses = [6].into_iter().collect();
        assert!(!sprint.accepts(&done, &defaults));
    }

    #[test]
    fn test_sprint_status_round_trip() {
        for status in [SprintStatus::Open, SprintStatus::Locked, SprintStatus::Closed] {
            assert_eq!(status.as_str().parse::<SprintStatus>().unwrap(), status);
        }
        assert!("paused".parse::<SprintStatus>().is_err());
    }

    #[test]
    fn test_attributes_drop_unknown_and_excluded_keys() {
        let map = json!({
            "id": 99,
            "prev_id": 4,
            "subject": "Login page",
            "colour": "red",
            "story_points": 5
        });
        let attrs =
            StoryAttributes::from_map(map.as_object().unwrap(), CREATE_EXCLUDED_FIELDS).unwrap();
        assert_eq!(attrs.subject.as_deref(), Some("Login page"));
        assert_eq!(attrs.story_points, Some(Some(5)));
        assert_eq!(attrs.project_id, None);
    }

    #[test]
    fn test_attributes_update_ignores_project() {
        let map = json!({ "project_id": 3, "sprint_id": null });
        let attrs =
            StoryAttributes::from_map(map.as_object().unwrap(), UPDATE_EXCLUDED_FIELDS).unwrap();
        assert_eq!(attrs.project_id, None);
        assert_eq!(attrs.sprint_id, Some(None));
    }

    #[test]
    fn test_attributes_reject_negative_points() {
        let map = json!({ "subject": "x", "story_points": -1 });
        let err =
            StoryAttributes::from_map(map.as_object().unwrap(), CREATE_EXCLUDED_FIELDS)
                .unwrap_err();
        assert!(
            matches!(err, BacklogError::InvalidInput { ref field, .. } if field == "story_points")
        );
    }

    #[test]
    fn test_attributes_accept_string_points_and_ids() {
        let map = json!({ "story_points": "s", "sprint_id": "7", "status_id": 2 });
        let attrs =
            StoryAttributes::from_map(map.as_object().unwrap(), CREATE_EXCLUDED_FIELDS).unwrap();
        assert_eq!(attrs.story_points, Some(Some(0)));
        assert_eq!(attrs.sprint_id, Some(Some(7)));
        assert_eq!(attrs.status_id, Some(2));
        assert!(!attrs.is_empty());
    }

    #[test]
    fn test_task_status_tally() {
        let task = |id, is_closed| Task {
            id,
            story_id: 1,
            subject: "t".to_string(),
            status_id: 1,
            is_closed,
        };
        let tasks = vec![task(1, true), task(2, false), task(3, false)];
        assert_eq!(
            TaskStatusCounts::tally(&tasks),
            TaskStatusCounts { open: 2, closed: 1 }
        );
    }
}
