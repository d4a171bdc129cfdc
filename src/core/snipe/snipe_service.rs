// Snipe service - remembers recently deleted and edited messages per channel,
// and pings aimed at each member, so they can be read back later.
//
// NO Discord dependencies here - the Discord layer converts gateway events
// into `SnipedMessage`/`Mention` values and drops bot authors before calling in.

use super::event_log::EventLog;
use super::event_window::by_author;
use super::snipe_models::{EditedMessage, Mention, SnipedMessage};

/// Only this many events are kept per channel (or per member for mentions).
pub const MAX_SNIPE_SIZE: usize = 100;

pub struct SnipeService {
    // Channel ID -> recently deleted messages
    deleted: EventLog<u64, SnipedMessage>,
    // Channel ID -> recent edits
    edited: EventLog<u64, EditedMessage>,
    // (Guild ID, mentioned User ID) -> pings
    mentions: EventLog<(u64, u64), Mention>,
}

impl SnipeService {
    pub fn new(capacity: usize) -> Self {
        Self {
            deleted: EventLog::new(capacity),
            edited: EventLog::new(capacity),
            mentions: EventLog::new(capacity),
        }
    }

    /// Remember a deleted message. Messages without text are not worth sniping.
    pub fn record_deleted(&self, message: SnipedMessage) -> bool {
        if message.content.trim().is_empty() {
            return false;
        }
        self.deleted.add(message.channel_id, message);
        true
    }

    /// Remember an edit. Skipped when the text did not actually change
    /// (embed unfurls trigger edits too).
    pub fn record_edited(&self, before: SnipedMessage, after: SnipedMessage) -> bool {
        if before.content.trim().is_empty() || before.content == after.content {
            return false;
        }
        self.edited
            .add(before.channel_id, EditedMessage { before, after });
        true
    }

    pub fn record_mention(&self, mention: Mention) -> bool {
        if mention.author_id == mention.mentioned_user_id {
            return false;
        }
        self.mentions
            .add((mention.guild_id, mention.mentioned_user_id), mention);
        true
    }

    /// The `index`-th most recent deletion in a channel, optionally by one author.
    pub fn snipe(&self, channel_id: u64, index: usize, author_id: Option<u64>) -> Option<SnipedMessage> {
        match author_id {
            Some(author_id) => {
                let filter = by_author::<SnipedMessage>(author_id);
                self.deleted.get(&channel_id, index, Some(&filter))
            }
            None => self.deleted.get(&channel_id, index, None),
        }
    }

    pub fn snipe_bulk(&self, channel_id: u64, author_id: Option<u64>) -> Vec<SnipedMessage> {
        match author_id {
            Some(author_id) => {
                let filter = by_author::<SnipedMessage>(author_id);
                self.deleted.get_all(&channel_id, Some(&filter))
            }
            None => self.deleted.get_all(&channel_id, None),
        }
    }

    pub fn edit_snipe(&self, channel_id: u64, index: usize, author_id: Option<u64>) -> Option<EditedMessage> {
        match author_id {
            Some(author_id) => {
                let filter = by_author::<EditedMessage>(author_id);
                self.edited.get(&channel_id, index, Some(&filter))
            }
            None => self.edited.get(&channel_id, index, None),
        }
    }

    pub fn edit_snipe_bulk(&self, channel_id: u64, author_id: Option<u64>) -> Vec<EditedMessage> {
        match author_id {
            Some(author_id) => {
                let filter = by_author::<EditedMessage>(author_id);
                self.edited.get_all(&channel_id, Some(&filter))
            }
            None => self.edited.get_all(&channel_id, None),
        }
    }

    /// Pings a member received in a guild, newest first.
    pub fn pending_mentions(&self, guild_id: u64, user_id: u64, author_id: Option<u64>) -> Vec<Mention> {
        let key = (guild_id, user_id);
        match author_id {
            Some(author_id) => {
                let filter = by_author::<Mention>(author_id);
                self.mentions.get_all(&key, Some(&filter))
            }
            None => self.mentions.get_all(&key, None),
        }
    }

    pub fn deleted(&self) -> &EventLog<u64, SnipedMessage> {
        &self.deleted
    }

    pub fn edited(&self) -> &EventLog<u64, EditedMessage> {
        &self.edited
    }

    pub fn mentions(&self) -> &EventLog<(u64, u64), Mention> {
        &self.mentions
    }
}

impl Default for SnipeService {
    fn default() -> Self {
        Self::new(MAX_SNIPE_SIZE)
    }
}
