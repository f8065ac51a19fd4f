use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::{MzaniGoError, Result};

/// Sliding-window limiter keyed by user id.
/// Guards the tools that spend model quota.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_seconds),
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub async fn check_rate_limit(&self, key: &str) -> Result<()> {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Result<()> {
        let mut hits = self.hits.lock().await;
        let window = hits.entry(key.to_string()).or_default();

        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) >= self.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.max_requests {
            return Err(MzaniGoError::RateLimited(format!(
                "{} requests per {}s exceeded for {}",
                self.max_requests,
                self.window.as_secs(),
                key
            )));
        }

        window.push_back(now);
        Ok(())
    }
}
