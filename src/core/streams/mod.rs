pub mod game_memo;
pub mod quota_tracker;
pub mod stream_fetcher;
pub mod stream_monitor;
pub mod streams_models;

pub use game_memo::{GameMemo, MemoSlot};
pub use quota_tracker::{QuotaState, QuotaTracker};
pub use stream_fetcher::{FetchConfig, StreamFetcher, StreamsApi};
pub use stream_monitor::{StreamAlert, StreamAnnouncement, StreamMonitor};
pub use streams_models::{
    Game, QuotaHeaders, Stream, StreamError, StreamPage, UpstreamResponse,
};

/// Scripted `StreamsApi` double shared by the stream tests.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub fn game(id: u64, name: &str) -> Game {
        Game {
            id,
            name: name.to_string(),
            box_art_url: String::new(),
        }
    }

    pub fn stream(id: u64, viewer_count: u64) -> Stream {
        Stream {
            id,
            game_id: 9,
            game_name: "Tetris".to_string(),
            user_name: format!("user{id}"),
            user_login: format!("user{id}"),
            title: format!("stream {id}"),
            viewer_count,
            language: "en".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            is_mature: false,
            tags: Vec::new(),
            thumbnail_url: String::new(),
        }
    }

    pub fn page(streams: Vec<Stream>, cursor: Option<&str>) -> StreamPage {
        StreamPage {
            streams,
            cursor: cursor.map(str::to_string),
        }
    }

    pub fn quota_reset_in(seconds: i64) -> QuotaHeaders {
        QuotaHeaders {
            remaining: None,
            reset_at: Some(Utc::now() + chrono::Duration::seconds(seconds)),
        }
    }

    /// Replays queued responses in order. An empty queue answers with an empty
    /// terminal page (or no games).
    #[derive(Default)]
    pub struct ScriptedApi {
        games: Mutex<VecDeque<UpstreamResponse<Vec<Game>>>>,
        pages: Mutex<VecDeque<UpstreamResponse<StreamPage>>>,
        game_lookups: Mutex<Vec<String>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_games(&self, response: UpstreamResponse<Vec<Game>>) {
            self.games.lock().unwrap().push_back(response);
        }

        pub fn push_page(&self, response: UpstreamResponse<StreamPage>) {
            self.pages.lock().unwrap().push_back(response);
        }

        pub fn game_calls(&self) -> usize {
            self.game_lookups.lock().unwrap().len()
        }

        pub fn stream_calls(&self) -> usize {
            self.cursors.lock().unwrap().len()
        }

        pub fn requested_cursors(&self) -> Vec<Option<String>> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StreamsApi for ScriptedApi {
        async fn get_games(
            &self,
            name: &str,
        ) -> Result<UpstreamResponse<Vec<Game>>, StreamError> {
            self.game_lookups.lock().unwrap().push(name.to_string());
            Ok(self
                .games
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| UpstreamResponse::ok(Vec::new(), QuotaHeaders::default())))
        }

        async fn get_streams(
            &self,
            _game_id: u64,
            cursor: Option<&str>,
            _first: u32,
        ) -> Result<UpstreamResponse<StreamPage>, StreamError> {
            self.cursors
                .lock()
                .unwrap()
                .push(cursor.map(str::to_string));
            Ok(self
                .pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| UpstreamResponse::ok(StreamPage::default(), QuotaHeaders::default())))
        }
    }
}
