//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, path::Path, sync::Arc};

use anyhow::anyhow;
use serde::Deserialize;

use super::types::{BotIdentity, Res, Void};

/// Default display name the bot posts under.
fn default_bot_username() -> String {
    "JiraBot".to_string()
}

/// Configuration for the jira-bot application.
///
/// Cheap to clone; the settings themselves live behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Display name used for replies, and to ignore our own messages (`BOT_USERNAME`).
    #[serde(default = "default_bot_username")]
    pub bot_username: String,
    /// Slack bot token (`SLACK_API_KEY`).
    pub slack_api_key: String,
    /// Slack app-level token for socket mode (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Jira base URL, e.g. `https://jira.example.com` (`JIRA_BASEURL`).
    pub jira_baseurl: String,
    /// Jira username (`JIRA_USERNAME`).
    pub jira_username: String,
    /// Jira password or API token (`JIRA_PASSWORD`).
    pub jira_password: String,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            bot_username: default_bot_username(),
            slack_api_key: String::new(),
            slack_app_token: String::new(),
            jira_baseurl: String::new(),
            jira_username: String::new(),
            jira_password: String::new(),
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default());

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Reject settings that would only fail later, at the first Slack or Jira call.
    pub fn validate(&self) -> Void {
        let required = [
            ("BOT_USERNAME", &self.bot_username),
            ("SLACK_API_KEY", &self.slack_api_key),
            ("SLACK_APP_TOKEN", &self.slack_app_token),
            ("JIRA_BASEURL", &self.jira_baseurl),
            ("JIRA_USERNAME", &self.jira_username),
            ("JIRA_PASSWORD", &self.jira_password),
        ];

        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(anyhow!("`{name}` must be set."));
        }

        if !self.jira_baseurl.starts_with("http://") && !self.jira_baseurl.starts_with("https://") {
            return Err(anyhow!("`JIRA_BASEURL` must be an http(s) URL."));
        }

        Ok(())
    }

    /// The identity the bot presents in Slack.
    pub fn identity(&self) -> BotIdentity {
        BotIdentity {
            display_name: self.bot_username.clone(),
        }
    }
}
