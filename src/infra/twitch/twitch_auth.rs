use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::core::streams::StreamError;

pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// App access token obtained through the client-credentials grant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppToken {
    pub access_token: String,
    /// Lifetime in seconds; 0 when Twitch did not say.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
}

pub async fn request_app_token(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<AppToken, StreamError> {
    let resp = Client::new()
        .post(token_url)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "client_credentials"),
        ])
        .send()
        .await
        .map_err(|e| StreamError::Transport(e.to_string()))?;

    match resp.status() {
        StatusCode::OK => {}
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(StreamError::Unauthorized)
        }
        other => {
            return Err(StreamError::Upstream {
                status: other.as_u16(),
            })
        }
    }

    let body = resp
        .text()
        .await
        .map_err(|e| StreamError::Transport(e.to_string()))?;
    parse_token(&body)
}

fn parse_token(body: &str) -> Result<AppToken, StreamError> {
    let token: AppToken =
        serde_json::from_str(body).map_err(|e| StreamError::Decode(e.to_string()))?;
    if token.access_token.is_empty() {
        return Err(StreamError::Decode("empty access token".to_string()));
    }

    tracing::info!(expires_in = token.expires_in, "Obtained Twitch app access token");
    Ok(token)
}
