//! Chat service integration for jira-bot.
//!
//! This module provides the Slack implementation of `GenericChatClient`:
//! - Receiving messages and events over a socket-mode session
//! - Posting replies
//! - Resolving channel names
//!
//! Incoming Slack events are translated into `ChatEvent`s and pushed onto the
//! event stream handed to `start`; nothing here decides what to do with them.

use crate::base::{
    config::Config,
    types::{ChatEvent, EventSender, InboundMessage, ReplyPayload, Res, Void},
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::{errors::SlackClientError, prelude::*};
use tracing::{info, instrument, warn};

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

/// Slack API error codes that mean our token is no good.
const AUTH_ERROR_CODES: &[&str] = &["invalid_auth", "not_authed", "account_inactive", "token_revoked", "token_expired"];

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    events: EventSender,
}

impl SlackUserState {
    /// Forward an event to the dispatcher, if it is still listening.
    fn forward(&self, event: ChatEvent) {
        if self.events.unbounded_send(event).is_err() {
            warn!("Dropping Slack event because the dispatcher has stopped.");
        }
    }
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    pub app_token: SlackApiToken,
    pub bot_token: SlackApiToken,
    pub client: Arc<FullClient>,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_api_key.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        Ok(Self { app_token, bot_token, client })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    #[instrument(name = "SlackChatClient::start", skip_all)]
    async fn start(&self, events: EventSender) -> Void {
        // Check the bot token up front, so a bad one shows up as an auth failure
        // rather than as a socket that never delivers anything.

        let session = self.open_session(&self.bot_token);

        match session.auth_test().await {
            Ok(bot_user) => info!("Slack bot user ID: {}", bot_user.user_id.0),
            Err(SlackClientError::ApiError(e)) if AUTH_ERROR_CODES.contains(&e.code.as_str()) => {
                let _ = events.unbounded_send(ChatEvent::AuthFailure);
                return Err(anyhow!("Slack rejected the bot token: {}", e.code));
            }
            Err(e) => {
                let _ = events.unbounded_send(ChatEvent::TransportError { description: e.to_string() });
                return Err(anyhow!("Failed to reach Slack: {}", e));
            }
        }

        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState { events: events.clone() }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events.
        if let Err(e) = socket_mode_listener.listen_for(&self.app_token).await {
            let _ = events.unbounded_send(ChatEvent::TransportError { description: e.to_string() });
            return Err(anyhow!("Failed to open the Slack socket: {}", e));
        }

        info!("Now listening for Slack events.");

        // Runs until Ctrl-C; the listener handles reconnects itself.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, reply), fields(channel_id = %reply.channel_id))]
    async fn send_reply(&self, reply: &ReplyPayload) -> Void {
        let message = SlackMessageContent::new().with_text(reply.text.clone());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(reply.channel_id.clone()), message)
            .with_username(reply.username.clone())
            .with_link_names(true);

        let session = self.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn channel_name(&self, channel_id: &str) -> Res<String> {
        let request = SlackApiConversationsInfoRequest::new(SlackChannelId(channel_id.to_string()));
        let session = self.open_session(&self.bot_token);

        let response = session.conversations_info(&request).await?;

        Ok(channel_display_name(&response.channel, channel_id))
    }
}

/// The channel's name, or its ID for conversations that have none (e.g. DMs).
fn channel_display_name(channel: &SlackChannelInfo, channel_id: &str) -> String {
    channel.name.clone().unwrap_or_else(|| channel_id.to_string())
}

// Event translation.

/// Translates a Slack message event into the dispatcher's view of a message.
///
/// Returns `None` for events that carry no channel (nothing to reply to).
pub fn to_inbound_message(event: &SlackMessageEvent) -> Option<InboundMessage> {
    let channel_id = event.origin.channel.as_ref()?.0.clone();
    let text = event.content.as_ref().and_then(|c| c.text.clone()).unwrap_or_default();
    let author_username = event.sender.username.clone().unwrap_or_default();
    let subtype = event
        .subtype
        .as_ref()
        .and_then(|s| serde_json::to_value(s).ok())
        .and_then(|v| v.as_str().map(str::to_string));

    Some(InboundMessage {
        text,
        channel_id,
        author_username,
        subtype,
    })
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("No app commands are currently supported.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(_event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow!("Failed to get user state"))?;

    user_state.forward(ChatEvent::Other { kind: "interaction".to_string() });

    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow!("Failed to get user state"))?;

    // Slack stamps every callback, which gives us a delivery latency for free.
    let latency = (Utc::now() - event_callback.event_time.0).to_std().unwrap_or_default();
    user_state.forward(ChatEvent::Latency { value: latency });

    let event = match &event_callback.event {
        SlackEventCallbackBody::Message(slack_message_event) => match to_inbound_message(slack_message_event) {
            Some(message) => ChatEvent::Message(message),
            None => ChatEvent::Other {
                kind: "message without channel".to_string(),
            },
        },
        _ => ChatEvent::Other { kind: "push".to_string() },
    };

    user_state.forward(event);

    Ok(())
}

// Tests.
