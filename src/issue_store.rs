//! In-memory issue key cache backing task-name autocomplete.

use jira_api::{JiraClient, JiraConfig};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::Config;

/// Thread-safe snapshot of the issue keys fetched when the popup opens.
#[derive(Clone, Default)]
pub struct IssueStore {
    keys: Arc<Mutex<Vec<String>>>,
}

impl IssueStore {
    /// Replaces current in-memory issue snapshot.
    pub fn set(&self, keys: Vec<String>) {
        *self.keys.lock().unwrap_or_else(PoisonError::into_inner) = keys;
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Keys containing `query` (case-insensitive), in fetch order.
    /// Queries shorter than `min_chars` yield nothing.
    pub fn suggest(&self, query: &str, min_chars: usize, limit: usize) -> Vec<String> {
        if query.chars().count() < min_chars {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|key| key.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Loads every issue key visible to the search endpoint.
pub async fn fetch_issue_keys(base_url: String, config: &Config) -> jira_api::Result<Vec<String>> {
    let client = JiraClient::new(JiraConfig::new(base_url).with_timeout(config.request_timeout()))?;
    let response = client.search_issues().await?;
    log::debug!("Fetched {} issues", response.issues.len());
    Ok(response.issues.into_iter().map(|issue| issue.key).collect())
}
