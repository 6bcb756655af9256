use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

const NANOS_PER_MINUTE: u128 = 60_000_000_000;

/// Body of `POST /rest/api/2/issue/{key}/worklog`.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorklogCreate {
    pub comment: String,
    pub started: String,
    pub time_spent: String,
}

impl WorklogCreate {
    pub fn new(comment: impl Into<String>, started: DateTime<Utc>, elapsed: Duration) -> Self {
        Self {
            comment: comment.into(),
            started: format_started(started),
            time_spent: format_time_spent(elapsed),
        }
    }
}

/// UTC timestamp with millisecond precision and a literal `+0000` zone suffix.
pub fn format_started(started: DateTime<Utc>) -> String {
    format!("{}+0000", started.format("%Y-%m-%dT%H:%M:%S%.3f"))
}

/// Elapsed time rounded up to whole minutes, e.g. `"3m"`.
pub fn format_time_spent(elapsed: Duration) -> String {
    let minutes = elapsed.as_nanos().div_ceil(NANOS_PER_MINUTE);
    format!("{}m", minutes)
}
