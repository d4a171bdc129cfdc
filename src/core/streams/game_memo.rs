use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use super::stream_fetcher::{StreamFetcher, StreamsApi};
use super::streams_models::{Game, StreamError};

/// What we remember about a lookup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoSlot {
    Found(Game),
    NotFound,
}

/// Process-lifetime cache of game-name lookups, negative results included.
///
/// There is no expiry: a name Twitch did not know about stays unknown until
/// restart.
pub struct GameMemo<A: StreamsApi> {
    fetcher: Arc<StreamFetcher<A>>,
    // One cell per key. The map lock is only held to find the cell, so a slow
    // lookup never blocks hits on other names; callers racing on the same key
    // wait on its cell and share one lookup.
    slots: Mutex<HashMap<String, Arc<OnceCell<MemoSlot>>>>,
}

impl<A: StreamsApi> GameMemo<A> {
    pub fn new(fetcher: Arc<StreamFetcher<A>>) -> Self {
        Self {
            fetcher,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn normalize(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub async fn resolve(&self, name: &str) -> Result<Game, StreamError> {
        let cell = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(Self::normalize(name)).or_default())
        };

        // A failed or cancelled lookup leaves the cell empty, so nothing is committed.
        let slot = cell
            .get_or_try_init(|| async {
                let slot = match self.fetcher.lookup_game(name).await? {
                    Some(game) => {
                        tracing::debug!(game_id = game.id, name = %game.name, "Resolved game");
                        MemoSlot::Found(game)
                    }
                    None => MemoSlot::NotFound,
                };
                Ok::<_, StreamError>(slot)
            })
            .await?;

        match slot {
            MemoSlot::Found(game) => Ok(game.clone()),
            MemoSlot::NotFound => Err(StreamError::NotFound(name.to_string())),
        }
    }

    /// Peek at the cached slot without touching the network.
    pub async fn cached(&self, name: &str) -> Option<MemoSlot> {
        let slots = self.slots.lock().await;
        slots
            .get(&Self::normalize(name))
            .and_then(|cell| cell.get().cloned())
    }
}
