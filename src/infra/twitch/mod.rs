// Twitch infra layer.
// - `twitch_client.rs` talks to the Helix HTTP API.
// - `twitch_auth.rs` fetches (and re-fetches) app access tokens.

#[path = "twitch_client.rs"]
pub mod twitch_client;

#[path = "twitch_auth.rs"]
pub mod twitch_auth;

#[cfg(test)]
#[path = "test_server.rs"]
pub(crate) mod test_server;

pub use twitch_auth::{request_app_token, AppToken};
pub use twitch_client::TwitchApiClient;
