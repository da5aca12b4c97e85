//! Whitelisted story attributes for create and update requests.

use serde_json::{Map, Value};

use super::points::points_from_i64;
use crate::error::{BacklogError, Result};

/// Field names a caller may set on a story.
pub const RECOGNIZED_STORY_FIELDS: &[&str] = &[
    "subject",
    "description",
    "project_id",
    "tracker_id",
    "status_id",
    "sprint_id",
    "story_points",
];

/// Keys never taken from a create request.
pub const CREATE_EXCLUDED_FIELDS: &[&str] = &["id", "prev_id"];

/// Keys never taken from an update request.
pub const UPDATE_EXCLUDED_FIELDS: &[&str] = &["id", "project_id"];

/// Whether `field` is a recognized story field.
pub fn is_recognized_story_field(field: &str) -> bool {
    RECOGNIZED_STORY_FIELDS.contains(&field)
}

/// Validated story attributes. `None` leaves a field untouched; the inner
/// `Option` of nullable fields distinguishes "clear" from "keep".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryAttributes {
    pub subject: Option<String>,
    pub description: Option<Option<String>>,
    pub project_id: Option<u64>,
    pub tracker_id: Option<u64>,
    pub status_id: Option<u64>,
    pub sprint_id: Option<Option<u64>>,
    pub story_points: Option<Option<u32>>,
}

impl StoryAttributes {
    /// Builds attributes from a loose map.
    ///
    /// Unknown keys and keys listed in `excluded` are dropped silently;
    /// recognized keys with out-of-domain values are rejected.
    pub fn from_map(map: &Map<String, Value>, excluded: &[&str]) -> Result<Self> {
        let mut attrs = Self::default();

        for (key, value) in map {
            if excluded.contains(&key.as_str()) || !is_recognized_story_field(key) {
                log::debug!("Dropping unrecognized story attribute '{key}'");
                continue;
            }

            match key.as_str() {
                "subject" => attrs.subject = Some(required_string(key, value)?),
                "description" => attrs.description = Some(optional_string(key, value)?),
                "project_id" => attrs.project_id = Some(required_id(key, value)?),
                "tracker_id" => attrs.tracker_id = Some(required_id(key, value)?),
                "status_id" => attrs.status_id = Some(required_id(key, value)?),
                "sprint_id" => attrs.sprint_id = Some(optional_id(key, value)?),
                "story_points" => attrs.story_points = Some(points_value(value)?),
                _ => {}
            }
        }

        Ok(attrs)
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn required_string(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(BacklogError::invalid_input(field).with_reason("must be a non-empty string")),
    }
}

fn optional_string(field: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(BacklogError::invalid_input(field).with_reason("must be a string or null")),
    }
}

fn required_id(field: &str, value: &Value) -> Result<u64> {
    optional_id(field, value)?
        .ok_or_else(|| BacklogError::invalid_input(field).with_reason("must not be null"))
}

fn optional_id(field: &str, value: &Value) -> Result<Option<u64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| BacklogError::invalid_input(field).with_reason("must be a positive id")),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => s
            .parse()
            .map(Some)
            .map_err(|_| {
                BacklogError::invalid_input(field).with_reason(format!("'{s}' is not an id"))
            }),
        _ => Err(BacklogError::invalid_input(field).with_reason("must be an id or null")),
    }
}

fn points_value(value: &Value) -> Result<Option<u32>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let n = n.as_i64().ok_or_else(|| {
                BacklogError::invalid_input("story_points").with_reason("must be a whole number")
            })?;
            points_from_i64(n).map(Some)
        }
        Value::String(s) => super::points::parse_points(s),
        _ => Err(BacklogError::invalid_input("story_points").with_reason("must be a number")),
    }
}
