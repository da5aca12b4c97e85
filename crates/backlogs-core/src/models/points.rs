//! Story point entry and display.

use crate::error::{BacklogError, Result};

/// Parses user-entered points.
///
/// Blank or `-` clears the estimate, `s`/`S` means sized as small (0), and a
/// non-negative integer sets it.
pub fn parse_points(input: &str) -> Result<Option<u32>> {
    let input = input.trim();
    if input.is_empty() || input == "-" {
        return Ok(None);
    }
    if input.eq_ignore_ascii_case("s") {
        return Ok(Some(0));
    }

    let value: i64 = input.parse().map_err(|_| {
        BacklogError::invalid_input("story_points")
            .with_reason(format!("'{input}' is not a number of points"))
    })?;
    points_from_i64(value).map(Some)
}

/// Checks that an integer lies within the points domain.
pub fn points_from_i64(value: i64) -> Result<u32> {
    if value < 0 {
        return Err(BacklogError::invalid_input("story_points")
            .with_reason(format!("points must not be negative, got {value}")));
    }
    u32::try_from(value).map_err(|_| {
        BacklogError::invalid_input("story_points").with_reason(format!("{value} is too large"))
    })
}

/// Renders points: `notsized` when unestimated, `S` for small.
pub fn points_display(points: Option<u32>, notsized: &str) -> String {
    match points {
        None => notsized.to_string(),
        Some(0) => "S".to_string(),
        Some(p) => p.to_string(),
    }
}
