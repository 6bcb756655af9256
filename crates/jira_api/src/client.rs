use crate::config::JiraConfig;
use crate::error::{JiraError, Result};
use crate::models::{IssueSearchResponse, WorklogCreate};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Clone)]
pub struct JiraClient {
    http: HttpClient,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self { http, config })
    }

    pub async fn get_with_query<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url_for(path);
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).query(query).send().await?;
        Self::parse_json(response).await
    }

    /// Sends a JSON body and hands back the raw status. Only transport failures are errors.
    pub async fn post_for_status<B>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<StatusCode>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url_for(path);
        tracing::debug!(%url, "POST");
        let payload = serde_json::to_vec(body)?;
        let response = self
            .http
            .post(url)
            .query(query)
            .body(payload)
            .send()
            .await?;
        let status = response.status();
        tracing::debug!(%status, "POST completed");
        Ok(status)
    }

    fn url_for(&self, path: &str) -> String {
        let mut base = self.config.api_root();
        base.push_str(path.trim_start_matches('/'));
        base
    }

    async fn parse_json<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(JiraError::from)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(JiraError::http(status, body))
        }
    }

    /// Fetches the issue list used for task-name hints.
    pub async fn search_issues(&self) -> Result<IssueSearchResponse> {
        let max_results = self.config.search_max_results.to_string();
        let query = [
            ("fields", self.config.search_fields.as_str()),
            ("maxResults", max_results.as_str()),
        ];
        self.get_with_query("search", &query).await
    }

    /// Posts a worklog against `issue_key`, letting the server adjust the remaining estimate.
    pub async fn add_worklog(&self, issue_key: &str, worklog: &WorklogCreate) -> Result<StatusCode> {
        let path = format!("issue/{}/worklog", issue_key);
        self.post_for_status(&path, &[("adjustEstimate", "AUTO")], worklog)
            .await
    }
}

fn build_http_client(config: &JiraConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, header_value(&config.user_agent)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| JiraError::Config(err.to_string()))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| JiraError::Config(err.to_string()))
}
