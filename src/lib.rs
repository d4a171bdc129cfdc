// Library root, so the core can be used (and tested) without a gateway connection.
//
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (Twitch HTTP API)
// - `discord/` = Discord-specific adapters (event ingestion, announcements)

#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;
#[path = "discord/discord_layer.rs"]
pub mod discord;

pub mod config;
