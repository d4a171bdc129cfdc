use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::game_memo::GameMemo;
use super::stream_fetcher::{StreamFetcher, StreamsApi};
use super::streams_models::{Game, Stream};

/// A game somebody wants announcements for, and where to post them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAlert {
    pub game: String,
    pub channel_ids: Vec<u64>,
}

/// A stream that went live since the previous poll, routed to one channel.
#[derive(Debug, Clone)]
pub struct StreamAnnouncement {
    pub channel_id: u64,
    pub stream: Stream,
}

/// Polls the configured games and reports streams that were not live last time.
pub struct StreamMonitor<A: StreamsApi> {
    games: Arc<GameMemo<A>>,
    fetcher: Arc<StreamFetcher<A>>,
    // Game id -> stream ids seen on the previous poll
    seen: RwLock<HashMap<u64, HashSet<u64>>>,
    last_checked: RwLock<Option<DateTime<Utc>>>,
}

impl<A: StreamsApi> StreamMonitor<A> {
    pub fn new(games: Arc<GameMemo<A>>, fetcher: Arc<StreamFetcher<A>>) -> Self {
        Self {
            games,
            fetcher,
            seen: RwLock::new(HashMap::new()),
            last_checked: RwLock::new(None),
        }
    }

    /// Check every alert once. The first poll of a game only records a baseline.
    ///
    /// Alerts naming the same game are merged first, so the game is fetched
    /// once and every subscribed channel hears about a new stream. A game that
    /// fails to resolve or fetch is logged and skipped; the rest still run.
    pub async fn poll(&self, alerts: &[StreamAlert]) -> Vec<StreamAnnouncement> {
        *self.last_checked.write().await = Some(Utc::now());
        let mut announcements = Vec::new();

        for (game, channel_ids) in self.resolve_targets(alerts).await {
            let streams = match self.fetcher.fetch_all(&game).await {
                Ok(streams) => streams,
                Err(err) => {
                    tracing::warn!(game_id = game.id, error = %err, "Failed to fetch streams");
                    continue;
                }
            };

            let current: HashSet<u64> = streams.iter().map(|s| s.id).collect();
            let previous = self.seen.write().await.insert(game.id, current);

            let Some(previous) = previous else {
                tracing::debug!(game_id = game.id, live = streams.len(), "Recorded stream baseline");
                continue;
            };

            let fresh = new_streams(&previous, streams);
            if !fresh.is_empty() {
                tracing::info!(game = %game.name, count = fresh.len(), "New streams went live");
            }

            for stream in fresh {
                for channel_id in &channel_ids {
                    announcements.push(StreamAnnouncement {
                        channel_id: *channel_id,
                        stream: stream.clone(),
                    });
                }
            }
        }

        announcements
    }

    /// Resolve every alert and merge channels per game, keeping first-seen order.
    async fn resolve_targets(&self, alerts: &[StreamAlert]) -> Vec<(Game, Vec<u64>)> {
        let mut targets: Vec<(Game, Vec<u64>)> = Vec::new();

        for alert in alerts {
            let game = match self.games.resolve(&alert.game).await {
                Ok(game) => game,
                Err(err) => {
                    tracing::warn!(game = %alert.game, error = %err, "Failed to resolve game");
                    continue;
                }
            };

            let index = match targets.iter().position(|(known, _)| known.id == game.id) {
                Some(index) => index,
                None => {
                    targets.push((game, Vec::new()));
                    targets.len() - 1
                }
            };
            let channels = &mut targets[index].1;
            for channel_id in &alert.channel_ids {
                if !channels.contains(channel_id) {
                    channels.push(*channel_id);
                }
            }
        }

        targets
    }

    pub async fn last_checked(&self) -> Option<DateTime<Utc>> {
        *self.last_checked.read().await
    }
}

/// Streams in `current` whose id was not in `previous`, keeping `current`'s order.
fn new_streams(previous: &HashSet<u64>, current: Vec<Stream>) -> Vec<Stream> {
    current
        .into_iter()
        .filter(|stream| !previous.contains(&stream.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::streams::quota_tracker::QuotaTracker;
    use crate::core::streams::stream_fetcher::FetchConfig;
    use crate::core::streams::streams_models::UpstreamResponse;
    use crate::core::streams::test_support::{game, page, stream, ScriptedApi};

    fn monitor(api: Arc<ScriptedApi>) -> StreamMonitor<Arc<ScriptedApi>> {
        let fetcher = Arc::new(StreamFetcher::new(
            api,
            Arc::new(QuotaTracker::new()),
            FetchConfig::default(),
        ));
        let games = Arc::new(GameMemo::new(fetcher.clone()));
        StreamMonitor::new(games, fetcher)
    }

    fn alert(game: &str, channels: &[u64]) -> StreamAlert {
        StreamAlert {
            game: game.to_string(),
            channel_ids: channels.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_first_poll_is_baseline_then_announces_new() {
        let api = Arc::new(ScriptedApi::new());
        api.push_games(UpstreamResponse::ok(vec![game(9, "Tetris")], Default::default()));
        api.push_page(UpstreamResponse::ok(
            page(vec![stream(1, 10), stream(2, 20)], None),
            Default::default(),
        ));
        api.push_page(UpstreamResponse::ok(
            page(vec![stream(2, 25), stream(3, 40), stream(1, 5)], None),
            Default::default(),
        ));

        let monitor = monitor(api.clone());
        let alerts = vec![alert("Tetris", &[100, 200])];

        assert!(monitor.poll(&alerts).await.is_empty());
        assert!(monitor.last_checked().await.is_some());

        let announcements = monitor.poll(&alerts).await;
        let routed: Vec<(u64, u64)> = announcements
            .iter()
            .map(|a| (a.channel_id, a.stream.id))
            .collect();
        assert_eq!(routed, vec![(100, 3), (200, 3)]);

        // The game was only looked up once.
        assert_eq!(api.game_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_game_is_skipped() {
        let api = Arc::new(ScriptedApi::new());
        api.push_games(UpstreamResponse::ok(vec![], Default::default()));
        api.push_games(UpstreamResponse::ok(vec![game(9, "Tetris")], Default::default()));
        api.push_page(UpstreamResponse::ok(page(vec![stream(1, 10)], None), Default::default()));

        let monitor = monitor(api.clone());
        let alerts = vec![alert("nosuchgame", &[1]), alert("Tetris", &[2])];

        assert!(monitor.poll(&alerts).await.is_empty());
        assert_eq!(api.game_calls(), 2);
        assert_eq!(api.stream_calls(), 1);
    }

    #[tokio::test]
    async fn test_alerts_for_same_game_are_merged() {
        let api = Arc::new(ScriptedApi::new());
        api.push_games(UpstreamResponse::ok(vec![game(9, "Tetris")], Default::default()));
        api.push_page(UpstreamResponse::ok(page(vec![stream(1, 10)], None), Default::default()));
        api.push_page(UpstreamResponse::ok(
            page(vec![stream(1, 10), stream(3, 40)], None),
            Default::default(),
        ));

        let monitor = monitor(api.clone());
        let alerts = vec![alert("Tetris", &[100]), alert("tetris", &[200, 100])];

        assert!(monitor.poll(&alerts).await.is_empty());
        let routed: Vec<(u64, u64)> = monitor
            .poll(&alerts)
            .await
            .iter()
            .map(|a| (a.channel_id, a.stream.id))
            .collect();

        assert_eq!(routed, vec![(100, 3), (200, 3)]);
        assert_eq!(api.stream_calls(), 2);
        assert_eq!(api.game_calls(), 1);
    }

    #[test]
    fn test_new_streams_keeps_order() {
        let previous: HashSet<u64> = [1, 2].into_iter().collect();
        let fresh = new_streams(&previous, vec![stream(5, 9), stream(1, 8), stream(4, 7)]);

        let ids: Vec<u64> = fresh.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![5, 4]);
    }
}
