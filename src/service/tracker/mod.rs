pub mod jira;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{IssueKey, Res, TicketRecord};

// Traits.

/// Generic issue tracker trait that clients must implement.
///
/// Implementing this trait allows a tracker other than Jira, or a fake in tests,
/// to be used with the jira-bot.
#[async_trait]
pub trait GenericTrackerClient: Send + Sync + 'static {
    /// Base URL that issue links are built from.
    fn base_url(&self) -> &str;

    /// Fetch a single issue by key.
    async fn get_issue(&self, key: &IssueKey) -> Res<TicketRecord>;
}

// Structs.

/// Tracker client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct TrackerClient {
    inner: Arc<dyn GenericTrackerClient>,
}

impl Deref for TrackerClient {
    type Target = dyn GenericTrackerClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl TrackerClient {
    pub fn new(inner: Arc<dyn GenericTrackerClient>) -> Self {
        Self { inner }
    }
}
