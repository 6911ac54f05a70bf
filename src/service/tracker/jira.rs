//! Jira REST implementation of `GenericTrackerClient`.

use std::sync::Arc;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::base::{
    config::Config,
    types::{IssueKey, Res, TicketRecord},
};

use super::{GenericTrackerClient, TrackerClient};

/// Path of the issue endpoint, relative to the base URL.
const JIRA_API_PATH: &str = "/rest/api/latest";

/// The longest error body we will echo into a log line.
const MAX_ERROR_BODY: usize = 256;

// Extra methods on `TrackerClient` applied by the jira implementation.

impl TrackerClient {
    /// Creates a new Jira tracker client.
    pub fn jira(config: &Config) -> Res<Self> {
        let client = JiraTrackerClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Wire types.

#[derive(Debug, Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraIssueFields,
}

#[derive(Debug, Deserialize)]
struct JiraIssueFields {
    summary: String,
    status: JiraStatus,
    reporter: Option<JiraUser>,
    assignee: Option<JiraUser>,
    created: String,
}

#[derive(Debug, Deserialize)]
struct JiraStatus {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraUser {
    display_name: String,
}

impl TryFrom<JiraIssue> for TicketRecord {
    type Error = anyhow::Error;

    fn try_from(issue: JiraIssue) -> Res<Self> {
        let created_at = parse_jira_timestamp(&issue.fields.created)?;

        Ok(TicketRecord {
            key: issue.key,
            status: issue.fields.status.name,
            summary: issue.fields.summary,
            reporter: issue.fields.reporter.map(|u| u.display_name).unwrap_or_default(),
            assignee: issue.fields.assignee.map(|u| u.display_name),
            created: issue.fields.created,
            created_at,
        })
    }
}

/// Parses Jira's timestamp format (`2016-03-10T10:08:04.000+0000`), falling back to RFC 3339.
pub fn parse_jira_timestamp(raw: &str) -> Res<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Unrecognized Jira timestamp `{raw}`"))
}

// Specific implementations.

/// Jira tracker client implementation.
#[derive(Clone)]
pub struct JiraTrackerClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl JiraTrackerClient {
    /// Create a new Jira tracker client.
    #[instrument(name = "JiraTrackerClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let http = reqwest::Client::builder().user_agent(concat!("jira-bot/", env!("CARGO_PKG_VERSION"))).build()?;

        Ok(Self {
            http,
            base_url: config.jira_baseurl.trim_end_matches('/').to_string(),
            username: config.jira_username.clone(),
            password: config.jira_password.clone(),
        })
    }
}

#[async_trait]
impl GenericTrackerClient for JiraTrackerClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(name = "JiraTrackerClient::get_issue", skip(self), fields(key = %key))]
    async fn get_issue(&self, key: &IssueKey) -> Res<TicketRecord> {
        let url = format!("{}{}/issue/{}", self.base_url, JIRA_API_PATH, key);

        debug!("Fetching issue from {}", url);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to reach Jira for `{key}`"))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();

            return Err(anyhow!("Jira returned {} for `{}`: {}", status, key, body));
        }

        let issue: JiraIssue = response.json().await.with_context(|| format!("Malformed Jira response for `{key}`"))?;

        issue.try_into()
    }
}

// Tests.
