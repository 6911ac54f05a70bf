use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// The sending half of the transport's event stream.
pub type EventSender = futures::channel::mpsc::UnboundedSender<ChatEvent>;

/// The receiving half of the transport's event stream.
pub type EventReceiver = futures::channel::mpsc::UnboundedReceiver<ChatEvent>;

/// A chat message as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    pub channel_id: String,
    pub author_username: String,
    pub subtype: Option<String>,
}

/// Everything the transport can hand to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A message posted to a channel the bot can see.
    Message(InboundMessage),
    /// Delay between the platform emitting an event and us receiving it.
    Latency { value: Duration },
    /// The platform rejected our credentials.
    AuthFailure,
    /// The session hit an error it could not handle itself.
    TransportError { description: String },
    /// Anything else; logged and dropped.
    Other { kind: String },
}

/// A normalized (upper-cased) Jira issue key, e.g. `PROJ-42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IssueKey(String);

impl IssueKey {
    /// Build a key from raw text, normalizing its case.
    pub fn new(raw: &str) -> Self {
        Self(raw.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IssueKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The subset of a Jira issue needed to render a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRecord {
    pub key: String,
    pub status: String,
    pub summary: String,
    pub reporter: String,
    pub assignee: Option<String>,
    /// Creation time exactly as Jira rendered it.
    pub created: String,
    pub created_at: DateTime<Utc>,
}

/// A fully rendered reply, ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPayload {
    pub channel_id: String,
    pub text: String,
    /// Display name the reply is posted under.
    pub username: String,
}

/// Who the bot is, as far as message filtering and reply tagging are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub display_name: String,
}

/// What happened to a single issue key mentioned in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Sent { key: IssueKey },
    Failed { key: IssueKey, reason: String },
}

impl ReplyOutcome {
    pub fn key(&self) -> &IssueKey {
        match self {
            ReplyOutcome::Sent { key } | ReplyOutcome::Failed { key, .. } => key,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, ReplyOutcome::Sent { .. })
    }
}
