use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::twitch_auth::{request_app_token, AppToken, TWITCH_TOKEN_URL};
use crate::core::streams::{
    Game, QuotaHeaders, Stream, StreamError, StreamPage, StreamsApi, UpstreamResponse,
};

pub const TWITCH_BASE_URL: &str = "https://api.twitch.tv";

const BOX_ART_SIZE: (u32, u32) = (180, 180);
const THUMBNAIL_SIZE: (u32, u32) = (1280, 720);
/// App tokens are renewed this long before Twitch says they expire.
const RENEW_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default)]
struct BearerToken {
    value: String,
    renew_at: Option<Instant>,
}

impl BearerToken {
    fn fixed(value: &str) -> Self {
        Self {
            value: value.to_string(),
            renew_at: None,
        }
    }

    fn from_app_token(token: AppToken, now: Instant) -> Self {
        let renew_at = (token.expires_in > 0)
            .then(|| now + Duration::from_secs(token.expires_in).saturating_sub(RENEW_MARGIN));
        Self {
            value: token.access_token,
            renew_at,
        }
    }

    fn needs_renewal(&self, now: Instant) -> bool {
        self.value.is_empty() || self.renew_at.is_some_and(|at| now >= at)
    }
}

/// Client credentials kept around so an expired app token can be replaced.
struct AppCredentials {
    client_id: String,
    client_secret: String,
    token_url: String,
}

/// Minimal Helix client. Every call is one Helix request; status and quota
/// headers are handed back untouched so the core can decide about retries.
pub struct TwitchApiClient {
    client: Client,
    base_url: String,
    token: RwLock<BearerToken>,
    credentials: Option<AppCredentials>,
}

impl TwitchApiClient {
    /// Use a ready-made token. It is never renewed.
    pub fn new(client_id: &str, access_token: &str) -> Result<Self, StreamError> {
        Self::with_base_url(client_id, access_token, TWITCH_BASE_URL)
    }

    pub fn with_base_url(
        client_id: &str,
        access_token: &str,
        base_url: &str,
    ) -> Result<Self, StreamError> {
        Self::build(client_id, base_url, BearerToken::fixed(access_token), None)
    }

    /// Use the client-credentials grant. The first token is fetched lazily (or
    /// by `renew_token`) and replaced before it expires or after a 401.
    pub fn with_app_credentials(client_id: &str, client_secret: &str) -> Result<Self, StreamError> {
        Self::with_app_credentials_at(client_id, client_secret, TWITCH_BASE_URL, TWITCH_TOKEN_URL)
    }

    pub fn with_app_credentials_at(
        client_id: &str,
        client_secret: &str,
        base_url: &str,
        token_url: &str,
    ) -> Result<Self, StreamError> {
        let credentials = AppCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_url: token_url.to_string(),
        };
        Self::build(client_id, base_url, BearerToken::default(), Some(credentials))
    }

    fn build(
        client_id: &str,
        base_url: &str,
        token: BearerToken,
        credentials: Option<AppCredentials>,
    ) -> Result<Self, StreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Client-ID",
            HeaderValue::from_str(client_id).map_err(|e| StreamError::Transport(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(token),
            credentials,
        })
    }

    /// Fetch a fresh app token now. No-op for a fixed token.
    pub async fn renew_token(&self) -> Result<(), StreamError> {
        let Some(credentials) = &self.credentials else {
            return Ok(());
        };
        let fresh = fetch_token(credentials).await?;
        *self.token.write().await = fresh;
        Ok(())
    }

    async fn bearer(&self) -> Result<String, StreamError> {
        let Some(credentials) = &self.credentials else {
            return Ok(self.token.read().await.value.clone());
        };

        {
            let token = self.token.read().await;
            if !token.needs_renewal(Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        let mut token = self.token.write().await;
        // Another request may have renewed it while we waited for the lock.
        if token.needs_renewal(Instant::now()) {
            *token = fetch_token(credentials).await?;
        }
        Ok(token.value.clone())
    }

    /// Forget a token Twitch rejected, so the next request fetches a new one.
    async fn discard_token(&self, rejected: &str) {
        if self.credentials.is_none() {
            return;
        }
        let mut token = self.token.write().await;
        if token.value == rejected {
            tracing::warn!("Twitch rejected the app access token, renewing on next request");
            *token = BearerToken::default();
        }
    }

    async fn get<T, U, F>(
        &self,
        path: &str,
        query: &[(&str, String)],
        map: F,
    ) -> Result<UpstreamResponse<U>, StreamError>
    where
        T: DeserializeOwned,
        F: FnOnce(T) -> Result<U, StreamError>,
    {
        let bearer = self.bearer().await?;
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .bearer_auth(&bearer)
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let quota = parse_quota_headers(resp.headers());

        if status == 401 {
            self.discard_token(&bearer).await;
        }
        if status != 200 {
            tracing::debug!(status, path, "Twitch returned a non-success status");
            return Ok(UpstreamResponse::status(status, quota));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()));
        Ok(decode_body(quota, body, map))
    }
}

async fn fetch_token(credentials: &AppCredentials) -> Result<BearerToken, StreamError> {
    let fresh = request_app_token(
        &credentials.token_url,
        &credentials.client_id,
        &credentials.client_secret,
    )
    .await?;
    Ok(BearerToken::from_app_token(fresh, Instant::now()))
}

#[async_trait]
impl StreamsApi for TwitchApiClient {
    async fn get_games(&self, name: &str) -> Result<UpstreamResponse<Vec<Game>>, StreamError> {
        let query = [("name", name.to_string()), ("first", "1".to_string())];
        self.get("/helix/games", &query, |envelope: ApiEnvelope<ApiGame>| {
            envelope
                .data
                .into_iter()
                .map(map_game)
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    async fn get_streams(
        &self,
        game_id: u64,
        cursor: Option<&str>,
        first: u32,
    ) -> Result<UpstreamResponse<StreamPage>, StreamError> {
        let mut query = vec![
            ("game_id", game_id.to_string()),
            ("first", first.to_string()),
            ("type", "live".to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("after", cursor.to_string()));
        }

        self.get("/helix/streams", &query, map_page).await
    }
}

/// Turn a 200 body into the mapped payload. When that fails the response is
/// still returned, without a body, so the caller sees the quota headers.
fn decode_body<T, U, F>(
    quota: QuotaHeaders,
    body: Result<String, StreamError>,
    map: F,
) -> UpstreamResponse<U>
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Result<U, StreamError>,
{
    let decoded = body
        .and_then(|text| {
            serde_json::from_str::<T>(&text).map_err(|e| StreamError::Decode(e.to_string()))
        })
        .and_then(map);

    match decoded {
        Ok(body) => UpstreamResponse::ok(body, quota),
        Err(err) => {
            tracing::warn!(error = %err, "Discarding undecodable Twitch response");
            UpstreamResponse {
                status: 200,
                quota,
                body: None,
            }
        }
    }
}

/// Read `Ratelimit-Remaining` and `Ratelimit-Reset` (unix seconds). Garbage is
/// treated like a missing header.
pub fn parse_quota_headers(headers: &HeaderMap) -> QuotaHeaders {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    };

    QuotaHeaders {
        remaining: header("Ratelimit-Remaining").and_then(|v| v.parse::<u32>().ok()),
        reset_at: header("Ratelimit-Reset")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
    }
}

fn parse_id(raw: &str, what: &str) -> Result<u64, StreamError> {
    raw.parse::<u64>()
        .map_err(|_| StreamError::Decode(format!("{what} id is not numeric: {raw}")))
}

fn sized(template: &str, (width, height): (u32, u32)) -> String {
    template
        .replace("{width}", &width.to_string())
        .replace("{height}", &height.to_string())
}

fn map_game(api: ApiGame) -> Result<Game, StreamError> {
    Ok(Game {
        id: parse_id(&api.id, "game")?,
        name: api.name,
        box_art_url: sized(&api.box_art_url.unwrap_or_default(), BOX_ART_SIZE),
    })
}

fn map_stream(api: ApiStream) -> Result<Stream, StreamError> {
    Ok(Stream {
        id: parse_id(&api.id, "stream")?,
        game_id: parse_id(&api.game_id, "game")?,
        game_name: api.game_name,
        user_name: api.user_name,
        user_login: api.user_login,
        title: api.title,
        viewer_count: api.viewer_count,
        language: api.language,
        started_at: api.started_at,
        is_mature: api.is_mature.unwrap_or(false),
        tags: api.tags.unwrap_or_default(),
        thumbnail_url: sized(&api.thumbnail_url, THUMBNAIL_SIZE),
    })
}

fn map_page(envelope: ApiEnvelope<ApiStream>) -> Result<StreamPage, StreamError> {
    let streams = envelope
        .data
        .into_iter()
        .map(map_stream)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StreamPage {
        streams,
        cursor: envelope
            .pagination
            .and_then(|p| p.cursor)
            .filter(|c| !c.is_empty()),
    })
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    pagination: Option<ApiPagination>,
}

#[derive(Debug, Deserialize)]
struct ApiPagination {
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiGame {
    id: String,
    name: String,
    box_art_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStream {
    id: String,
    game_id: String,
    #[serde(default)]
    game_name: String,
    user_name: String,
    user_login: String,
    #[serde(default)]
    title: String,
    viewer_count: u64,
    #[serde(default)]
    language: String,
    started_at: DateTime<Utc>,
    #[serde(default)]
    is_mature: Option<bool>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    thumbnail_url: String,
}
