use chrono::{DateTime, Utc};

use super::event_window::Authored;

/// Snapshot of a message taken when it was deleted or edited.
///
/// Plain values only, so the core never holds on to Discord types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnipedMessage {
    pub message_id: u64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub avatar_url: Option<String>,
    pub content: String,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Authored for SnipedMessage {
    fn author_id(&self) -> u64 {
        self.author_id
    }
}

/// A message edit, both sides kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedMessage {
    pub before: SnipedMessage,
    pub after: SnipedMessage,
}

impl Authored for EditedMessage {
    // The author of the original message, whatever the edited copy says.
    fn author_id(&self) -> u64 {
        self.before.author_id
    }
}

/// A ping aimed at a member, kept until they come back to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub mentioned_user_id: u64,
    pub jump_url: String,
    pub mentioned_at: DateTime<Utc>,
}

impl Mention {
    pub fn jump_url(guild_id: u64, channel_id: u64, message_id: u64) -> String {
        format!("https://discord.com/channels/{guild_id}/{channel_id}/{message_id}")
    }
}

impl Authored for Mention {
    fn author_id(&self) -> u64 {
        self.author_id
    }
}
