pub mod event_log;
pub mod event_window;
pub mod snipe_models;
pub mod snipe_service;

pub use event_log::EventLog;
pub use event_window::{by_author, Authored, EventFilter, EventWindow};
pub use snipe_models::{EditedMessage, Mention, SnipedMessage};
pub use snipe_service::{SnipeService, MAX_SNIPE_SIZE};
