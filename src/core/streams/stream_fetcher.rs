use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::quota_tracker::QuotaTracker;
use super::streams_models::{
    sort_by_popularity, Game, Stream, StreamError, StreamPage, UpstreamResponse,
};

/// Twitch caps `first` at 100 for both endpoints we use.
pub const PAGE_SIZE: u32 = 100;

// ============================================================================
// UPSTREAM TRAIT (PORT)
// ============================================================================

/// The two Helix calls the fetcher needs. Each method performs exactly one HTTP
/// request and reports the status and quota headers as-is; interpreting them is
/// the fetcher's job.
#[async_trait]
pub trait StreamsApi: Send + Sync {
    async fn get_games(&self, name: &str) -> Result<UpstreamResponse<Vec<Game>>, StreamError>;

    async fn get_streams(
        &self,
        game_id: u64,
        cursor: Option<&str>,
        first: u32,
    ) -> Result<UpstreamResponse<StreamPage>, StreamError>;
}

#[async_trait]
impl<T: StreamsApi + ?Sized> StreamsApi for Arc<T> {
    async fn get_games(&self, name: &str) -> Result<UpstreamResponse<Vec<Game>>, StreamError> {
        (**self).get_games(name).await
    }

    async fn get_streams(
        &self,
        game_id: u64,
        cursor: Option<&str>,
        first: u32,
    ) -> Result<UpstreamResponse<StreamPage>, StreamError> {
        (**self).get_streams(game_id, cursor, first).await
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Budget for one `fetch_all` or lookup, quota waits included.
    pub timeout: Duration,
    /// `None` keeps retrying rate-limited requests until the deadline.
    pub max_rate_limit_retries: Option<u32>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_rate_limit_retries: None,
        }
    }
}

// ============================================================================
// FETCHER
// ============================================================================

/// Drives cursor-paginated requests against one quota bucket.
pub struct StreamFetcher<A: StreamsApi> {
    api: A,
    quota: Arc<QuotaTracker>,
    config: FetchConfig,
}

impl<A: StreamsApi> StreamFetcher<A> {
    pub fn new(api: A, quota: Arc<QuotaTracker>, config: FetchConfig) -> Self {
        Self { api, quota, config }
    }

    pub fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }

    /// Fetch a single page. Exactly one HTTP call, no waiting and no retry.
    pub async fn fetch_page(
        &self,
        game_id: u64,
        cursor: Option<&str>,
    ) -> Result<StreamPage, StreamError> {
        let response = self.api.get_streams(game_id, cursor, PAGE_SIZE).await?;
        self.accept(response).await
    }

    /// Fetch every live stream for `game`, most-watched first.
    pub async fn fetch_all(&self, game: &Game) -> Result<Vec<Stream>, StreamError> {
        self.fetch_all_within(game, self.config.timeout).await
    }

    pub async fn fetch_all_within(
        &self,
        game: &Game,
        budget: Duration,
    ) -> Result<Vec<Stream>, StreamError> {
        tokio::time::timeout(budget, self.collect_pages(game.id))
            .await
            .map_err(|_| StreamError::Timeout(budget))?
    }

    /// Look a game up by name. `Ok(None)` means Twitch has no such game.
    pub async fn lookup_game(&self, name: &str) -> Result<Option<Game>, StreamError> {
        let budget = self.config.timeout;
        let lookup = self.with_quota_retry(move || async move {
            let response = self.api.get_games(name).await?;
            self.accept(response).await
        });

        let games = tokio::time::timeout(budget, lookup)
            .await
            .map_err(|_| StreamError::Timeout(budget))??;
        Ok(games.into_iter().next())
    }

    async fn collect_pages(&self, game_id: u64) -> Result<Vec<Stream>, StreamError> {
        let mut streams = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .with_quota_retry(|| self.fetch_page(game_id, cursor.as_deref()))
                .await?;
            pages += 1;

            tracing::debug!(
                game_id,
                page = pages,
                count = page.streams.len(),
                has_more = page.cursor.is_some(),
                "Fetched stream page"
            );

            // An empty page can still carry a cursor; only a missing one ends the walk.
            streams.extend(page.streams);

            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        sort_by_popularity(&mut streams);
        Ok(streams)
    }

    /// Run `call` until it stops reporting `QuotaExceeded`, waiting on the quota
    /// tracker before every attempt.
    async fn with_quota_retry<T, F, Fut>(&self, mut call: F) -> Result<T, StreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StreamError>>,
    {
        let mut retries = 0u32;
        loop {
            self.quota.wait_for_capacity().await;

            match call().await {
                Err(StreamError::QuotaExceeded) => {
                    retries += 1;
                    if let Some(max) = self.config.max_rate_limit_retries {
                        if retries > max {
                            return Err(StreamError::Upstream { status: 429 });
                        }
                    }
                    tracing::warn!(retries, "Twitch rate limited the request, retrying");
                    // Fail-open waits return immediately; let the runtime breathe.
                    tokio::task::yield_now().await;
                }
                other => return other,
            }
        }
    }

    /// Feed the quota headers back and translate the status code.
    async fn accept<T>(&self, response: UpstreamResponse<T>) -> Result<T, StreamError> {
        let quota = response.quota;
        match response.status {
            200 => {
                self.quota.observe(quota.remaining, quota.reset_at).await;
                response.body.ok_or_else(|| {
                    StreamError::Decode("200 response without a usable body".to_string())
                })
            }
            429 => {
                self.quota.observe(Some(0), quota.reset_at).await;
                Err(StreamError::QuotaExceeded)
            }
            401 => {
                self.quota.observe(quota.remaining, quota.reset_at).await;
                Err(StreamError::Unauthorized)
            }
            status => {
                self.quota.observe(quota.remaining, quota.reset_at).await;
                Err(StreamError::Upstream { status })
            }
        }
    }
}
