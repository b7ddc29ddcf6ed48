use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

/// Per-key budget for the auth endpoints.
const MAX_REQUESTS: u32 = 5;
const WINDOW_SECS: u64 = 60;

/// Fixed-window counters kept in process memory.
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ok(remaining) while under the limit, Err(retry_after) once exhausted.
    pub async fn check(&self, key: &str) -> Result<u32, Duration> {
        self.check_with_limits(key, MAX_REQUESTS, WINDOW_SECS).await
    }

    pub async fn check_with_limits(
        &self,
        key: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) > window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= max_requests {
            return Err(window.saturating_sub(now.duration_since(entry.window_start)));
        }

        entry.count += 1;
        Ok(max_requests - entry.count)
    }

    /// Forget windows that ended long ago; run from the maintenance task.
    pub async fn cleanup(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        let now = Instant::now();
        let keep_for = Duration::from_secs(WINDOW_SECS * 2);

        entries.retain(|_, entry| now.duration_since(entry.window_start) < keep_for);
        before - entries.len()
    }
}

/// Keyed by client IP and path so login and register have separate budgets.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = addr.ip().to_string();
    let path = req.uri().path().to_string();
    let key = format!("{}:{}", ip, path);

    match state.rate_limiter.check(&key).await {
        Ok(remaining) => {
            tracing::debug!(ip = %ip, path = %path, remaining, "Rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                ip = %ip,
                path = %path,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_under_limit() {
        let limiter = RateLimitState::new();
        for i in 0..MAX_REQUESTS {
            let result = limiter.check("127.0.0.1:/api/v1/auth/login").await;
            assert!(result.is_ok(), "Request {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn blocks_over_limit() {
        let limiter = RateLimitState::new();
        for _ in 0..MAX_REQUESTS {
            let _ = limiter.check("k").await;
        }
        assert!(limiter.check("k").await.is_err());
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimitState::new();
        for _ in 0..MAX_REQUESTS {
            let _ = limiter.check("login").await;
        }
        assert!(limiter.check("register").await.is_ok());
    }

    #[tokio::test]
    async fn zero_length_window_resets() {
        let limiter = RateLimitState::new();
        assert!(limiter.check_with_limits("k", 1, 0).await.is_ok());
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(limiter.check_with_limits("k", 1, 0).await.is_ok());
    }

    #[tokio::test]
    async fn cleanup_keeps_recent_windows() {
        let limiter = RateLimitState::new();
        let _ = limiter.check("fresh").await;
        assert_eq!(limiter.cleanup().await, 0);
    }
}
