mod issue;
mod worklog;

pub use issue::{Issue, IssueFieldRef, IssueFields, IssueSearchResponse};
pub use worklog::{format_started, format_time_spent, WorklogCreate};
