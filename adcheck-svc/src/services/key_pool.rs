//! API key rotation
//!
//! Inference backends enforce per-key rate limits; the pool spreads
//! requests across the configured keys and benches a key that reports
//! rate exhaustion until its cooldown expires. Callers acquire a key per
//! request and report 429s back through `mark_rate_limited`.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Minimum spacing between requests on the same key
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);
/// How long a rate-limited key stays benched
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

struct KeyState {
    key: String,
    /// Key is benched until this instant
    available_at: Instant,
    last_used: Option<Instant>,
}

/// Rotating pool of API keys with per-key pacing and cooldown
pub struct ApiKeyPool {
    keys: Mutex<Vec<KeyState>>,
    min_interval: Duration,
    cooldown: Duration,
}

impl ApiKeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self::with_intervals(keys, DEFAULT_MIN_INTERVAL, DEFAULT_COOLDOWN)
    }

    pub fn with_intervals(keys: Vec<String>, min_interval: Duration, cooldown: Duration) -> Self {
        let now = Instant::now();
        Self {
            keys: Mutex::new(
                keys.into_iter()
                    .map(|key| KeyState {
                        key,
                        available_at: now,
                        last_used: None,
                    })
                    .collect(),
            ),
            min_interval,
            cooldown,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }

    /// Acquire a key, waiting out per-key pacing if necessary.
    ///
    /// Prefers the least-recently-used key among those not cooling down.
    /// Returns `None` when the pool is empty or every key is benched;
    /// callers degrade to their conservative default in that case.
    pub async fn acquire(&self) -> Option<String> {
        loop {
            let wait = {
                let mut keys = self.keys.lock().await;
                let now = Instant::now();

                let candidate = keys
                    .iter_mut()
                    .filter(|k| k.available_at <= now)
                    .min_by_key(|k| k.last_used);

                match candidate {
                    None => {
                        if !keys.is_empty() {
                            warn!("all API keys are cooling down");
                        }
                        return None;
                    }
                    Some(state) => {
                        let ready_at = state
                            .last_used
                            .map(|t| t + self.min_interval)
                            .unwrap_or(now);
                        if ready_at <= now {
                            state.last_used = Some(now);
                            return Some(state.key.clone());
                        }
                        ready_at - now
                    }
                }
            };
            // Pacing wait with the lock released
            tokio::time::sleep(wait).await;
        }
    }

    /// Bench a key that hit the backend's rate limit.
    pub async fn mark_rate_limited(&self, key: &str) {
        let mut keys = self.keys.lock().await;
        if let Some(state) = keys.iter_mut().find(|k| k.key == key) {
            state.available_at = Instant::now() + self.cooldown;
            debug!(cooldown_secs = self.cooldown.as_secs(), "benched rate-limited API key");
        }
    }
}
