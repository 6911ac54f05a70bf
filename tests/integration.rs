#![cfg(test)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::DateTime;
use jira_bot::{
    base::{
        config::{Config, ConfigInner},
        types::{ChatEvent, EventSender, InboundMessage, IssueKey, ReplyOutcome, ReplyPayload, Res, TicketRecord, Void},
    },
    interaction::dispatch::Dispatcher,
    runtime::Runtime,
    service::{
        chat::{ChatClient, GenericChatClient},
        tracker::{GenericTrackerClient, TrackerClient},
    },
};
use mockall::mock;

const BASE_URL: &str = "https://jira.example.com";

// Mocks.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        async fn start(&self, events: EventSender) -> Void;
        async fn send_reply(&self, reply: &ReplyPayload) -> Void;
        async fn channel_name(&self, channel_id: &str) -> Res<String>;
    }
}

mock! {
    pub Tracker {}

    #[async_trait]
    impl GenericTrackerClient for Tracker {
        fn base_url(&self) -> &str;
        async fn get_issue(&self, key: &IssueKey) -> Res<TicketRecord>;
    }
}

/// A tracker that panics on one key and succeeds on the rest.
struct PanickingTracker {
    panic_on: &'static str,
}

#[async_trait]
impl GenericTrackerClient for PanickingTracker {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn get_issue(&self, key: &IssueKey) -> Res<TicketRecord> {
        if key.as_str() == self.panic_on {
            panic!("tracker blew up on {key}");
        }

        Ok(create_test_ticket(key))
    }
}

// Helpers.

fn create_test_config() -> Config {
    Config {
        inner: Arc::new(ConfigInner {
            bot_username: "JiraBot".to_string(),
            slack_api_key: "xoxb-test".to_string(),
            slack_app_token: "xapp-test".to_string(),
            jira_baseurl: BASE_URL.to_string(),
            jira_username: "bot".to_string(),
            jira_password: "secret".to_string(),
        }),
    }
}

fn create_test_ticket(key: &IssueKey) -> TicketRecord {
    TicketRecord {
        key: key.to_string(),
        status: "Open".to_string(),
        summary: format!("Summary of {key}"),
        reporter: "Alice Example".to_string(),
        assignee: None,
        created: "2016-03-10T10:08:04.000+0000".to_string(),
        created_at: DateTime::from_timestamp(1457604484, 0).unwrap(),
    }
}

fn create_test_message(text: &str, author: &str, subtype: Option<&str>) -> InboundMessage {
    InboundMessage {
        text: text.to_string(),
        channel_id: "C12345".to_string(),
        author_username: author.to_string(),
        subtype: subtype.map(str::to_string),
    }
}

/// A chat mock that records every reply it is asked to send.
fn get_mock_chat(sent: Arc<Mutex<Vec<ReplyPayload>>>) -> MockChat {
    let mut mock = MockChat::new();

    mock.expect_channel_name().returning(|_| Ok("general".to_string()));
    mock.expect_send_reply().returning(move |reply| {
        sent.lock().unwrap().push(reply.clone());
        Ok(())
    });

    mock
}

/// A tracker mock that fails for the listed keys and succeeds for the rest.
fn get_mock_tracker(failing: &'static [&'static str]) -> MockTracker {
    let mut mock = MockTracker::new();

    mock.expect_base_url().return_const(BASE_URL.to_string());
    mock.expect_get_issue().returning(move |key| {
        if failing.iter().any(|f| *f == key.as_str()) {
            Err(anyhow!("Jira returned 404 Not Found for `{key}`"))
        } else {
            Ok(create_test_ticket(key))
        }
    });

    mock
}

fn create_dispatcher(chat: MockChat, tracker: impl GenericTrackerClient) -> Dispatcher {
    Dispatcher::new(&create_test_config(), ChatClient::new(Arc::new(chat)), TrackerClient::new(Arc::new(tracker)))
}

fn sent_keys(sent: &Arc<Mutex<Vec<ReplyPayload>>>) -> Vec<String> {
    sent.lock()
        .unwrap()
        .iter()
        .map(|reply| reply.text.split('|').nth(1).unwrap_or_default().split('>').next().unwrap_or_default().to_string())
        .collect()
}

// Tests.

#[tokio::test]
async fn test_mention_gets_one_reply() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let mut tracker = MockTracker::new();
    tracker.expect_base_url().return_const(BASE_URL.to_string());
    tracker
        .expect_get_issue()
        .withf(|key| key.as_str() == "PROJ-42")
        .times(1)
        .returning(|key| Ok(create_test_ticket(key)));

    let dispatcher = create_dispatcher(get_mock_chat(sent.clone()), tracker);
    let outcomes = dispatcher.handle_message(&create_test_message("check PROJ-42 please", "alice", None)).await;

    assert_eq!(outcomes, vec![ReplyOutcome::Sent { key: IssueKey::new("PROJ-42") }]);

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel_id, "C12345");
    assert_eq!(sent[0].username, "JiraBot");
    assert!(sent[0].text.contains("PROJ-42"));
    assert!(sent[0].text.contains("https://jira.example.com/browse/PROJ-42"));
    assert!(sent[0].text.contains("_Unassigned_"));
}

#[tokio::test]
async fn test_failed_lookup_does_not_block_siblings() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = create_dispatcher(get_mock_chat(sent.clone()), get_mock_tracker(&["A-1"]));

    let outcomes = dispatcher.handle_message(&create_test_message("A-1 and B-2", "alice", None)).await;

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(&outcomes[0], ReplyOutcome::Failed { key, reason } if key.as_str() == "A-1" && reason.contains("404")));
    assert_eq!(outcomes[1], ReplyOutcome::Sent { key: IssueKey::new("B-2") });
    assert_eq!(sent_keys(&sent), vec!["B-2"]);
}

#[tokio::test]
async fn test_failed_send_does_not_block_siblings() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let sink = sent.clone();

    let mut chat = MockChat::new();
    chat.expect_channel_name().returning(|_| Ok("general".to_string()));
    chat.expect_send_reply().returning(move |reply| {
        if reply.text.contains("|OPS-1>") {
            return Err(anyhow!("Failed to send message: channel_not_found"));
        }
        sink.lock().unwrap().push(reply.clone());
        Ok(())
    });

    let dispatcher = create_dispatcher(chat, get_mock_tracker(&[]));
    let outcomes = dispatcher.handle_message(&create_test_message("OPS-1, OPS-2, OPS-3", "alice", None)).await;

    let sent_flags: Vec<bool> = outcomes.iter().map(ReplyOutcome::is_sent).collect();
    assert_eq!(sent_flags, vec![false, true, true]);
    assert_eq!(sent_keys(&sent), vec!["OPS-2", "OPS-3"]);
}

#[tokio::test]
async fn test_panicking_lookup_is_contained() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = create_dispatcher(get_mock_chat(sent.clone()), PanickingTracker { panic_on: "BOOM-1" });

    let outcomes = dispatcher.handle_message(&create_test_message("BOOM-1 then OK-2", "alice", None)).await;

    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].is_sent());
    assert_eq!(outcomes[0].key().as_str(), "BOOM-1");
    assert!(outcomes[1].is_sent());
    assert_eq!(sent_keys(&sent), vec!["OK-2"]);
}

#[tokio::test]
async fn test_duplicate_mentions_get_one_reply() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let mut tracker = MockTracker::new();
    tracker.expect_base_url().return_const(BASE_URL.to_string());
    tracker.expect_get_issue().times(2).returning(|key| Ok(create_test_ticket(key)));

    let dispatcher = create_dispatcher(get_mock_chat(sent.clone()), tracker);
    let outcomes = dispatcher.handle_message(&create_test_message("PROJ-1 proj-1 DEF-2 PROJ-1", "alice", None)).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(sent_keys(&sent), vec!["PROJ-1", "DEF-2"]);
}

#[tokio::test]
async fn test_own_and_bot_messages_are_ignored() {
    let mut chat = MockChat::new();
    chat.expect_send_reply().never();
    chat.expect_channel_name().never();

    let mut tracker = MockTracker::new();
    tracker.expect_get_issue().never();

    let dispatcher = create_dispatcher(chat, tracker);

    assert!(dispatcher.handle_message(&create_test_message("PROJ-42", "JiraBot", None)).await.is_empty());
    assert!(dispatcher.handle_message(&create_test_message("PROJ-42", "deploybot", Some("bot_message"))).await.is_empty());
}

#[tokio::test]
async fn test_message_without_keys_is_quiet() {
    let mut chat = MockChat::new();
    chat.expect_send_reply().never();

    let mut tracker = MockTracker::new();
    tracker.expect_get_issue().never();

    let dispatcher = create_dispatcher(chat, tracker);

    assert!(dispatcher.handle_message(&create_test_message("hello world", "alice", None)).await.is_empty());
    assert!(dispatcher.handle_message(&create_test_message("", "alice", None)).await.is_empty());
}

#[tokio::test]
async fn test_transport_signals_are_only_logged() {
    let mut chat = MockChat::new();
    chat.expect_send_reply().never();

    let mut tracker = MockTracker::new();
    tracker.expect_get_issue().never();

    let dispatcher = create_dispatcher(chat, tracker);

    let events = vec![
        ChatEvent::Latency { value: Duration::from_millis(120) },
        ChatEvent::AuthFailure,
        ChatEvent::TransportError {
            description: "socket closed".to_string(),
        },
        ChatEvent::Other { kind: "push".to_string() },
    ];

    for event in events {
        assert!(dispatcher.handle_event(event).await.is_empty());
    }
}

#[tokio::test]
async fn test_run_drains_the_event_stream() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = create_dispatcher(get_mock_chat(sent.clone()), get_mock_tracker(&["BAD-1"]));

    let events = futures::stream::iter(vec![
        ChatEvent::Latency { value: Duration::from_millis(80) },
        ChatEvent::Message(create_test_message("first PROJ-1", "alice", None)),
        ChatEvent::Message(create_test_message("BAD-1 is broken, PROJ-2 is fine", "bob", None)),
        ChatEvent::Message(create_test_message("> <https://jira.example.com/browse/PROJ-1|PROJ-1>", "JiraBot", Some("bot_message"))),
        ChatEvent::TransportError {
            description: "socket reset".to_string(),
        },
        ChatEvent::Message(create_test_message("and PROJ-3", "carol", None)),
    ]);

    dispatcher.run(events).await;

    assert_eq!(sent_keys(&sent), vec!["PROJ-1", "PROJ-2", "PROJ-3"]);
}

#[tokio::test]
async fn test_runtime_dispatches_listener_events() {
    let sent = Arc::new(Mutex::new(Vec::new()));

    let mut chat = get_mock_chat(sent.clone());
    chat.expect_start().times(1).returning(|events| {
        events.unbounded_send(ChatEvent::Latency { value: Duration::from_millis(50) }).unwrap();
        events
            .unbounded_send(ChatEvent::Message(create_test_message("check PROJ-42 please", "alice", None)))
            .unwrap();
        Ok(())
    });

    let runtime = Runtime {
        config: create_test_config(),
        chat: ChatClient::new(Arc::new(chat)),
        tracker: TrackerClient::new(Arc::new(get_mock_tracker(&[]))),
    };

    runtime.start().await.unwrap();

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("https://jira.example.com/browse/PROJ-42"));
}

#[tokio::test]
async fn test_runtime_surfaces_listener_failure() {
    let mut chat = MockChat::new();
    chat.expect_send_reply().never();
    chat.expect_start().times(1).returning(|events| {
        events.unbounded_send(ChatEvent::AuthFailure).unwrap();
        Err(anyhow!("Slack rejected the bot token: invalid_auth"))
    });

    let runtime = Runtime {
        config: create_test_config(),
        chat: ChatClient::new(Arc::new(chat)),
        tracker: TrackerClient::new(Arc::new(get_mock_tracker(&[]))),
    };

    let err = runtime.start().await.unwrap_err();

    assert!(err.to_string().contains("invalid_auth"));
}
