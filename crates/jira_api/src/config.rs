use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "jira-timer";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SEARCH_FIELDS: &str = "issuetype,summary,status,resolution,created,updated";
pub const DEFAULT_SEARCH_MAX_RESULTS: u32 = 1500;

/// Connection settings for one Jira server. The base URL is whatever the user stored, e.g. `https://jira.example.com`.
#[derive(Clone, Debug)]
pub struct JiraConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub search_fields: String,
    pub search_max_results: u32,
}

impl JiraConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            search_fields: DEFAULT_SEARCH_FIELDS.to_string(),
            search_max_results: DEFAULT_SEARCH_MAX_RESULTS,
        }
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Root of the REST v2 API, always ending with a slash.
    pub fn api_root(&self) -> String {
        format!("{}/rest/api/2/", self.base_url.trim_end_matches('/'))
    }
}
