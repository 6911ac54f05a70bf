//! Library root for `jira-bot`.
//!
//! Jira-bot watches Slack channels for Jira issue keys (e.g. `PROJ-42`) and
//! replies in-channel with the issue's status, summary, people, and creation
//! date.
//!
//! The bot integrates with Slack for chat and Jira for issue lookups. The
//! architecture is built around traits for each external service, so the
//! message pipeline can be driven by fakes in tests.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use anyhow::anyhow;
use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the jira-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with chat and tracker clients
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting jira-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install the default crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config)?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
