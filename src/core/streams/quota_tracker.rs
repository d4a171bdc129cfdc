// Tracks the request allowance for one Twitch rate-limit bucket.
//
// Every request against the bucket goes through `wait_for_capacity` first, and
// every response (success or not) is fed back through `observe`. One tracker
// is shared by `Arc` between everything that hits the same bucket.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

/// Twitch's default app-token bucket is 800 points per minute.
pub const DEFAULT_REMAINING: u32 = 800;

/// Slack added on top of the reset instant to absorb clock skew.
const RESET_SLACK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaState {
    pub remaining: u32,
    pub reset_instants: BTreeSet<DateTime<Utc>>,
}

impl Default for QuotaState {
    fn default() -> Self {
        Self {
            remaining: DEFAULT_REMAINING,
            reset_instants: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct QuotaTracker {
    state: Mutex<QuotaState>,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known state. Mostly useful in tests.
    pub fn with_state(state: QuotaState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Record the quota headers of a response. Missing headers leave the matching
    /// field alone.
    pub async fn observe(&self, remaining: Option<u32>, reset_at: Option<DateTime<Utc>>) {
        let mut state = self.state.lock().await;
        if let Some(remaining) = remaining {
            state.remaining = remaining;
        }
        if let Some(reset_at) = reset_at {
            state.reset_instants.insert(reset_at);
        }
    }

    /// Suspend until the bucket is expected to have capacity again.
    ///
    /// `remaining` is not reset here; the next `observe` from the retried request
    /// restores it. With no known reset instant this returns immediately.
    pub async fn wait_for_capacity(&self) {
        let wait = {
            let mut state = self.state.lock().await;
            let now = Utc::now();
            state.reset_instants.retain(|reset| *reset > now);

            if state.remaining > 0 {
                return;
            }

            match state.reset_instants.first() {
                Some(reset) => (*reset - now).to_std().unwrap_or_default() + RESET_SLACK,
                None => {
                    tracing::warn!("Twitch quota exhausted with no known reset time, proceeding");
                    return;
                }
            }
        };

        tracing::warn!(wait_ms = wait.as_millis() as u64, "Twitch quota exhausted, waiting for reset");
        tokio::time::sleep(wait).await;
    }

    pub async fn snapshot(&self) -> QuotaState {
        self.state.lock().await.clone()
    }
}
