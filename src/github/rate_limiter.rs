use std::time::{Instant, SystemTime, UNIX_EPOCH};

use reqwest::Response;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

pub struct RateLimiter {
    state: Mutex<RateLimitState>,
    max_per_minute: Option<u32>,
}

struct RateLimitState {
    remaining: u32,
    reset_at: Option<Instant>,
    requests_this_minute: u32,
    minute_start: Instant,
}

impl RateLimiter {
    /// `max_per_minute` adds a soft cap on top of the limits GitHub reports.
    pub fn new(max_per_minute: Option<u32>) -> Self {
        Self {
            state: Mutex::new(RateLimitState {
                remaining: 5000,
                reset_at: None,
                requests_this_minute: 0,
                minute_start: Instant::now(),
            }),
            max_per_minute: max_per_minute.filter(|limit| *limit > 0),
        }
    }

    pub async fn wait(&self) {
        let mut state = self.state.lock().await;

        if state.remaining == 0 {
            if let Some(reset_at) = state.reset_at.take() {
                let now = Instant::now();
                if reset_at > now {
                    let wait_duration = reset_at - now;
                    drop(state);
                    tracing::info!("Rate limited, waiting {:?}", wait_duration);
                    sleep(wait_duration).await;
                    state = self.state.lock().await;
                }
            }
        }

        if let Some(limit) = self.max_per_minute {
            let minute_elapsed = state.minute_start.elapsed();
            if minute_elapsed < Duration::from_secs(60) {
                if state.requests_this_minute >= limit {
                    let wait_time = Duration::from_secs(60) - minute_elapsed;
                    drop(state);
                    tracing::debug!("Soft rate limiting, waiting {:?}", wait_time);
                    sleep(wait_time).await;
                    state = self.state.lock().await;
                    state.requests_this_minute = 0;
                    state.minute_start = Instant::now();
                }
            } else {
                state.requests_this_minute = 0;
                state.minute_start = Instant::now();
            }
        }

        state.requests_this_minute += 1;
    }

    pub async fn update_from_response(&self, response: &Response) {
        let Some(remaining) = header_number::<u32>(response, "x-ratelimit-remaining") else {
            return;
        };
        let reset = header_number::<u64>(response, "x-ratelimit-reset");

        let mut state = self.state.lock().await;
        state.remaining = remaining;
        if let Some(reset_timestamp) = reset {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            if reset_timestamp > now {
                let wait_secs = reset_timestamp - now;
                state.reset_at = Some(Instant::now() + Duration::from_secs(wait_secs));
            }
        }
    }

    pub async fn remaining(&self) -> u32 {
        self.state.lock().await.remaining
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(None)
    }
}

fn header_number<T: std::str::FromStr>(response: &Response, name: &str) -> Option<T> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
