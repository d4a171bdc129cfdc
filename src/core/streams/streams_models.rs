use std::hash::{Hash, Hasher};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Everything that can go wrong while talking to Twitch.
///
/// `QuotaExceeded` is only ever returned by a single-shot `fetch_page` call;
/// the retrying entry points absorb it and keep waiting until the deadline.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Twitch rejected our credentials, check the client id and access token")]
    Unauthorized,

    #[error("That game does not exist on Twitch: {0}")]
    NotFound(String),

    #[error("Twitch returned status {status}")]
    Upstream { status: u16 },

    #[error("Gave up waiting on Twitch after {0:?}")]
    Timeout(Duration),

    #[error("Twitch rate limit exceeded")]
    QuotaExceeded,

    #[error("Twitch request failed: {0}")]
    Transport(String),

    #[error("Unexpected Twitch payload: {0}")]
    Decode(String),
}

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// A game (Twitch "category"). Names are only lookup keys, identity is the id.
#[derive(Debug, Clone)]
pub struct Game {
    pub id: u64,
    pub name: String,
    pub box_art_url: String,
}

impl PartialEq for Game {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Game {}

impl Hash for Game {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One live stream, built from a single page payload and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Stream {
    pub id: u64,
    pub game_id: u64,
    pub game_name: String,
    pub user_name: String,
    pub user_login: String,
    pub title: String,
    pub viewer_count: u64,
    pub language: String,
    pub started_at: DateTime<Utc>,
    pub is_mature: bool,
    pub tags: Vec<String>,
    pub thumbnail_url: String,
}

impl Stream {
    pub fn url(&self) -> String {
        format!("https://twitch.tv/{}", self.user_login)
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Stream {}

impl Hash for Stream {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One page of `/helix/streams`.
#[derive(Debug, Clone, Default)]
pub struct StreamPage {
    pub streams: Vec<Stream>,
    /// `None` on the terminal page.
    pub cursor: Option<String>,
}

/// Rate-limit headers, read from every response whatever its status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaHeaders {
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Raw outcome of exactly one HTTP call.
///
/// `body` is only populated for a 200; the core decides what every other
/// status means.
#[derive(Debug, Clone)]
pub struct UpstreamResponse<T> {
    pub status: u16,
    pub quota: QuotaHeaders,
    pub body: Option<T>,
}

impl<T> UpstreamResponse<T> {
    pub fn ok(body: T, quota: QuotaHeaders) -> Self {
        Self {
            status: 200,
            quota,
            body: Some(body),
        }
    }

    pub fn status(status: u16, quota: QuotaHeaders) -> Self {
        Self {
            status,
            quota,
            body: None,
        }
    }
}

/// Sort streams most-watched first. Ties go to the lower id so the order is stable
/// across polls.
pub fn sort_by_popularity(streams: &mut [Stream]) {
    streams.sort_by(|a, b| {
        b.viewer_count
            .cmp(&a.viewer_count)
            .then_with(|| a.id.cmp(&b.id))
    });
}
