//! Event handling and user interactions for jira-bot.
//!
//! This module provides the message pipeline:
//! - Deciding which messages to act on
//! - Extracting issue keys from message text
//! - Rendering replies
//! - Dispatching events from the chat service to the tracker and back

pub mod dispatch;
pub mod extract;
pub mod filter;
pub mod format;
