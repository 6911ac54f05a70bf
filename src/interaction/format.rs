//! Renders a Jira issue into a Slack reply.

use crate::base::types::{BotIdentity, ReplyPayload, TicketRecord};

/// Shown in place of the assignee for unassigned issues.
pub const UNASSIGNED_PLACEHOLDER: &str = "_Unassigned_";

/// The browse URL for an issue.
pub fn browse_url(tracker_base_url: &str, key: &str) -> String {
    format!("{}/browse/{}", tracker_base_url.trim_end_matches('/'), key)
}

/// Formats the three-line mrkdwn summary of an issue.
///
/// The creation line uses Slack's `<!date^...>` token so each reader sees the time
/// in their own zone, with Jira's raw timestamp as the fallback text.
pub fn format_reply(ticket: &TicketRecord, tracker_base_url: &str) -> String {
    format!(
        "> <{url}|{key}> :traffic_light: *Status:* {status} :memo: *Summary:* {summary}\n\
         > :bust_in_silhouette: *Creator:* {reporter}, *Assignee:* {assignee}\n\
         > :calendar: *Created:* <!date^{epoch}^{{date}} at {{time}}|{created}>",
        url = browse_url(tracker_base_url, &ticket.key),
        key = ticket.key,
        status = ticket.status,
        summary = ticket.summary,
        reporter = ticket.reporter,
        assignee = ticket.assignee.as_deref().unwrap_or(UNASSIGNED_PLACEHOLDER),
        epoch = ticket.created_at.timestamp(),
        created = ticket.created,
    )
}

/// Wraps a formatted issue into a payload addressed to `channel_id`.
pub fn build_reply(ticket: &TicketRecord, channel_id: &str, identity: &BotIdentity, tracker_base_url: &str) -> ReplyPayload {
    ReplyPayload {
        channel_id: channel_id.to_string(),
        text: format_reply(ticket, tracker_base_url),
        username: identity.display_name.clone(),
    }
}
