//! Date/time tool.
//!
//! Returns the current date, time (with explicit UTC-offset label), and
//! weekday name. The weekday is computed with Zeller's congruence rather
//! than read from the clock library, and calendar inputs are validated
//! before the computation so an out-of-range month or day produces a
//! descriptive error instead of a wrong date.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::{json, Value};

use quill_types::error::ToolError;
use quill_types::llm::ToolSpec;

use super::{Tool, ToolOutput, DATE_TIME_TOOL};

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Name of the weekday for a calendar date, via Zeller's congruence.
///
/// Zeller treats January and February as months 13 and 14 of the previous
/// year. The raw congruence is Saturday-indexed; the result is shifted to a
/// Monday-zero index before lookup.
pub fn day_name(year: i32, month: u32, day: u32) -> Result<&'static str, ToolError> {
    if year < 1 {
        return Err(invalid("year must be a positive integer"));
    }
    if !(1..=12).contains(&month) {
        return Err(invalid("month must be between 1 and 12"));
    }
    if !(1..=31).contains(&day) {
        return Err(invalid("day must be between 1 and 31"));
    }

    let (m, y) = if month < 3 {
        (month + 12, year - 1)
    } else {
        (month, year)
    };
    let q = day as i64;
    let m = m as i64;
    let k = (y % 100) as i64;
    let j = (y / 100) as i64;

    // h: 0 = Saturday .. 6 = Friday
    let h = (q + (13 * (m + 1)) / 5 + k + k / 4 + j / 4 + 5 * j).rem_euclid(7);
    let monday_zero = (h + 5) % 7;

    Ok(DAY_NAMES[monday_zero as usize])
}

fn invalid(message: &str) -> ToolError {
    ToolError::InvalidArguments {
        tool: DATE_TIME_TOOL.to_string(),
        message: message.to_string(),
    }
}

/// Tool returning the current UTC date, time, and weekday name.
#[derive(Debug, Default)]
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        DATE_TIME_TOOL
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: DATE_TIME_TOOL.to_string(),
            description: "Get the current date, time, and day name. Takes no arguments."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    async fn invoke(&self, _arguments: &Value) -> Result<ToolOutput, ToolError> {
        let now = Utc::now();
        let date = now.format("%Y-%m-%d").to_string();
        let time = now.format("%H:%M:%S").to_string();
        let weekday = day_name(now.year(), now.month(), now.day())?;

        let display = format!("{date} {time} (UTC+00:00)");
        Ok(ToolOutput {
            content: format!(
                "Date: {date}\n\nTime: {time} (UTC+00:00)\n\nDay Name: {weekday}"
            ),
            urls: Vec::new(),
            display: Some(display),
        })
    }
}
