// Runtime configuration, read from the environment (a `.env` file is loaded
// by `main` first).

use std::time::Duration;

use thiserror::Error;

use crate::core::snipe::MAX_SNIPE_SIZE;
use crate::core::streams::{FetchConfig, StreamAlert};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("Set either TWITCH_ACCESS_TOKEN or TWITCH_CLIENT_SECRET")]
    MissingTwitchCredentials,
}

/// How the bot authenticates against Helix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwitchCredentials {
    AccessToken(String),
    /// Exchanged for app tokens at startup and again before each expires.
    ClientSecret(String),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub twitch_client_id: String,
    pub twitch_credentials: TwitchCredentials,
    pub stream_alerts: Vec<StreamAlert>,
    pub poll_interval: Duration,
    pub fetch: FetchConfig,
    pub snipe_capacity: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        let twitch_client_id =
            get("TWITCH_CLIENT_ID").ok_or(ConfigError::Missing("TWITCH_CLIENT_ID"))?;

        // A ready token wins over the secret.
        let twitch_credentials = match (get("TWITCH_ACCESS_TOKEN"), get("TWITCH_CLIENT_SECRET")) {
            (Some(token), _) => TwitchCredentials::AccessToken(token),
            (None, Some(secret)) => TwitchCredentials::ClientSecret(secret),
            (None, None) => return Err(ConfigError::MissingTwitchCredentials),
        };

        let stream_alerts = match get("STREAM_ALERTS") {
            Some(raw) => parse_stream_alerts(&raw)?,
            None => Vec::new(),
        };

        let poll_secs = parse_number("STREAM_POLL_INTERVAL_SECS", get("STREAM_POLL_INTERVAL_SECS"))?
            .unwrap_or(300);
        let timeout_secs = parse_number("TWITCH_FETCH_TIMEOUT_SECS", get("TWITCH_FETCH_TIMEOUT_SECS"))?
            .unwrap_or(60);
        let max_rate_limit_retries = parse_number(
            "TWITCH_MAX_RATE_LIMIT_RETRIES",
            get("TWITCH_MAX_RATE_LIMIT_RETRIES"),
        )?;
        let snipe_capacity = parse_number("SNIPE_CAPACITY", get("SNIPE_CAPACITY"))?
            .unwrap_or(MAX_SNIPE_SIZE);

        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "STREAM_POLL_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            discord_token,
            twitch_client_id,
            twitch_credentials,
            stream_alerts,
            poll_interval: Duration::from_secs(poll_secs),
            fetch: FetchConfig {
                timeout: Duration::from_secs(timeout_secs),
                max_rate_limit_retries,
            },
            snipe_capacity,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(None),
    }
}

/// Parses `Game Name=123,456;Other Game=789`.
pub fn parse_stream_alerts(raw: &str) -> Result<Vec<StreamAlert>, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "STREAM_ALERTS",
        value: raw.to_string(),
    };

    let mut alerts = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (game, channels) = entry.split_once('=').ok_or_else(invalid)?;
        let game = game.trim();
        if game.is_empty() {
            return Err(invalid());
        }

        let channel_ids = channels
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| c.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        if channel_ids.is_empty() {
            return Err(invalid());
        }

        alerts.push(StreamAlert {
            game: game.to_string(),
            channel_ids,
        });
    }

    Ok(alerts)
}
