// Discord layer - gateway event adapters.
//
// This layer is THIN: it turns serenity types into plain core values and
// hands them to the services. No business logic lives here.

use std::sync::Arc;

use crate::core::snipe::SnipeService;
use crate::core::streams::{StreamAlert, StreamMonitor};
use crate::infra::twitch::TwitchApiClient;

#[path = "snipe/events.rs"]
pub mod events;

#[path = "streams/announcer.rs"]
pub mod announcer;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Shared state handed to every event handler.
pub struct Data {
    pub snipe: Arc<SnipeService>,
    pub streams: Arc<StreamMonitor<TwitchApiClient>>,
    pub stream_alerts: Arc<Vec<StreamAlert>>,
}
