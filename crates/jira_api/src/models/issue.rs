use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Body of `GET /rest/api/2/search`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct IssueSearchResponse {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: Option<IssueFields>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub issuetype: Option<IssueFieldRef>,
    #[serde(default)]
    pub status: Option<IssueFieldRef>,
    #[serde(default)]
    pub resolution: Option<IssueFieldRef>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// Named reference such as a status or issue type; Jira returns these as objects with at least a `name`.
#[derive(Debug, Deserialize, Clone)]
pub struct IssueFieldRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}
