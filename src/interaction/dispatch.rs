//! The dispatch loop: turns chat events into issue lookups and replies.

use anyhow::anyhow;
use futures::{Stream, StreamExt};
use tracing::{Instrument, Level, debug, error, info, instrument, trace, warn};

use crate::{
    base::{
        config::Config,
        types::{BotIdentity, ChatEvent, InboundMessage, IssueKey, ReplyOutcome, Void},
    },
    interaction::{extract::extract_issue_keys, filter::should_process, format::build_reply},
    service::{chat::ChatClient, tracker::TrackerClient},
};

/// Consumes chat events and replies to issue mentions.
///
/// Holds nothing but read-only handles, so it is trivially cloneable.
#[derive(Clone)]
pub struct Dispatcher {
    identity: BotIdentity,
    chat: ChatClient,
    tracker: TrackerClient,
}

impl Dispatcher {
    pub fn new(config: &Config, chat: ChatClient, tracker: TrackerClient) -> Self {
        Self {
            identity: config.identity(),
            chat,
            tracker,
        }
    }

    /// Drains `events` one at a time until the stream ends.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = ChatEvent>,
    {
        info!("Now listening for events.");

        let mut events = std::pin::pin!(events);

        while let Some(event) = events.next().await {
            self.handle_event(event).await;
        }

        info!("Event stream closed.");
    }

    /// Handles a single event, returning what happened to each issue key it mentioned.
    pub async fn handle_event(&self, event: ChatEvent) -> Vec<ReplyOutcome> {
        match event {
            ChatEvent::Message(message) => return self.handle_message(&message).await,
            ChatEvent::Latency { value } => debug!("Current latency: {:?}", value),
            ChatEvent::AuthFailure => error!("Invalid credentials."),
            ChatEvent::TransportError { description } => warn!("Transport error: {}", description),
            ChatEvent::Other { kind } => trace!("Ignoring `{}` event.", kind),
        }

        Vec::new()
    }

    /// Replies to every distinct issue key in `message`.
    ///
    /// Keys are handled in order, one at a time, and a failure on one key never
    /// stops the others. The result holds one outcome per key.
    #[instrument(skip_all, fields(channel_id = %message.channel_id))]
    pub async fn handle_message(&self, message: &InboundMessage) -> Vec<ReplyOutcome> {
        if !should_process(message, &self.identity) {
            debug!("Ignoring message.");
            return Vec::new();
        }

        let keys = extract_issue_keys(&message.text);

        if keys.is_empty() {
            return Vec::new();
        }

        if tracing::enabled!(Level::DEBUG) {
            match self.chat.channel_name(&message.channel_id).await {
                Ok(name) => debug!("Found {} issue key(s) in #{}.", keys.len(), name),
                Err(err) => debug!("Found {} issue key(s); channel lookup failed: {}", keys.len(), err),
            }
        }

        let mut outcomes = Vec::with_capacity(keys.len());

        for key in keys {
            info!("Identified {} in message.", key);
            outcomes.push(self.respond_to_issue(&message.channel_id, key).await);
        }

        outcomes
    }

    /// Fetches one issue and posts its summary, containing any failure.
    ///
    /// The work runs in its own task so that even a panic stays inside this key.
    async fn respond_to_issue(&self, channel_id: &str, key: IssueKey) -> ReplyOutcome {
        let task = tokio::spawn(respond_to_issue_internal(self.clone(), channel_id.to_string(), key.clone()).in_current_span());

        let result = match task.await {
            Ok(result) => result,
            Err(err) => Err(anyhow!("Reply task aborted: {}", err)),
        };

        match result {
            Ok(()) => ReplyOutcome::Sent { key },
            Err(err) => {
                error!("Error responding to issue {}: {:#}", key, err);
                ReplyOutcome::Failed { key, reason: format!("{err:#}") }
            }
        }
    }
}

#[instrument(skip_all, fields(key = %key))]
async fn respond_to_issue_internal(dispatcher: Dispatcher, channel_id: String, key: IssueKey) -> Void {
    let ticket = dispatcher.tracker.get_issue(&key).await?;
    let reply = build_reply(&ticket, &channel_id, &dispatcher.identity, dispatcher.tracker.base_url());

    dispatcher.chat.send_reply(&reply).await
}
