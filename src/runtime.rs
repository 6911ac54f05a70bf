//! Runtime services and shared state for the jira-bot.

use anyhow::anyhow;
use futures::channel::mpsc;
use tracing::{Instrument, error, info, instrument};

use crate::{
    base::{
        config::Config,
        types::{EventReceiver, EventSender, Res, Void},
    },
    interaction::dispatch::Dispatcher,
    service::{chat::ChatClient, tracker::TrackerClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the chat client, tracker client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The issue tracker client instance.
    pub tracker: TrackerClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Res<Self> {
        // Initialize the chat client.
        let chat = ChatClient::slack(&config)?;

        // Initialize the tracker client.
        let tracker = TrackerClient::jira(&config)?;

        Ok(Self { config, chat, tracker })
    }

    /// Run until the chat session ends.
    ///
    /// The chat listener runs in a background task and feeds the dispatcher
    /// through a channel; the dispatcher stops once the listener drops its end.
    pub async fn start(&self) -> Void {
        let (events_tx, events_rx): (EventSender, EventReceiver) = mpsc::unbounded();

        let chat = self.chat.clone();
        let listener = tokio::spawn(async move { chat.start(events_tx).await }.in_current_span());

        let dispatcher = Dispatcher::new(&self.config, self.chat.clone(), self.tracker.clone());
        dispatcher.run(events_rx).await;

        let result = match listener.await {
            Ok(result) => result,
            Err(err) => Err(anyhow!("Chat listener task failed: {}", err)),
        };

        match &result {
            Ok(()) => info!("Chat listener stopped."),
            Err(err) => error!("Chat listener stopped with an error: {:#}", err),
        }

        result
    }
}
