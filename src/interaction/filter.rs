//! Decides which inbound messages the bot should look at.

use crate::base::types::{BotIdentity, InboundMessage};

/// Slack's subtype for messages posted by integrations and bots.
const BOT_MESSAGE_SUBTYPE: &str = "bot_message";

/// Returns `false` for our own replies and for other automated posts, which would
/// otherwise loop when they contain issue keys.
pub fn should_process(message: &InboundMessage, identity: &BotIdentity) -> bool {
    message.author_username != identity.display_name && message.subtype.as_deref() != Some(BOT_MESSAGE_SUBTYPE)
}
