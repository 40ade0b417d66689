//! Fixed-window rate limiting for the login endpoint.
//!
//! Counters are kept per client address and per attempted username, each
//! resetting at the end of its window. The client address is the peer
//! address unless the deployment sits behind a proxy it trusts to set
//! `X-Forwarded-For`.

use axum::{extract::ConnectInfo, http::HeaderMap};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    net::SocketAddr,
    time::{Duration, Instant},
};
use tracing::warn;

/// Upper bound on tracked keys; the stalest window is evicted beyond it.
const MAX_TRACKED_KEYS: usize = 4096;

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    limit: u32,
    window: Duration,
    enabled: bool,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration, enabled: bool) -> Self {
        Self {
            limit,
            window,
            enabled,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Counts one attempt for `key`.
    ///
    /// Returns `Err(retry_after_secs)` once the window's budget is spent.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        self.check_bounded(key, now, MAX_TRACKED_KEYS)
    }

    fn check_bounded(&self, key: &str, now: Instant, capacity: usize) -> Result<(), u64> {
        if !self.enabled {
            return Ok(());
        }

        let mut windows = self.windows.lock();

        if windows.len() >= capacity && !windows.contains_key(key) {
            let span = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < span);

            if windows.len() >= capacity {
                let stalest = windows
                    .iter()
                    .min_by_key(|(_, w)| w.started)
                    .map(|(k, _)| k.clone());
                if let Some(stalest) = stalest {
                    windows.remove(&stalest);
                }
            }
        }

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.limit {
            let remaining = self.window.saturating_sub(now.duration_since(window.started));
            let retry_after = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            warn!(client = key, retry_after, "Login rate limit exceeded");
            return Err(retry_after.max(1));
        }

        window.count += 1;
        Ok(())
    }

    /// Counts one attempt against `username`, regardless of where it came from.
    pub fn check_username(&self, username: &str) -> Result<(), u64> {
        self.check(&username_key(username))
    }
}

fn username_key(username: &str) -> String {
    format!("user:{}", username.trim().to_lowercase())
}

/// Key identifying the caller for throttling purposes.
///
/// `X-Forwarded-For` is client-controlled, so it is only read when
/// `trust_forwarded` says a proxy in front of us rewrites it.
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    trust_forwarded: bool,
) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .filter(|_| trust_forwarded)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    match (forwarded, peer) {
        (Some(hop), _) => hop.to_string(),
        (None, Some(ConnectInfo(addr))) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_fixed_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60), true);
        let start = Instant::now();

        assert!(limiter.check_at("1.2.3.4", start).is_ok());
        assert!(limiter.check_at("1.2.3.4", start).is_ok());

        let retry = limiter
            .check_at("1.2.3.4", start + Duration::from_secs(10))
            .unwrap_err();
        assert_eq!(retry, 50);

        // other clients are unaffected
        assert!(limiter.check_at("5.6.7.8", start).is_ok());

        // a new window starts fresh
        assert!(
            limiter
                .check_at("1.2.3.4", start + Duration::from_secs(61))
                .is_ok()
        );
    }

    #[test]
    fn test_disabled_limiter_never_throttles() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60), false);
        for _ in 0..100 {
            assert!(limiter.check("1.2.3.4").is_ok());
        }
    }

    #[test]
    fn test_client_key() {
        let mut headers = HeaderMap::new();
        let peer = ConnectInfo("10.0.0.1:5555".parse::<SocketAddr>().unwrap());

        assert_eq!(client_key(&headers, Some(&peer), false), "10.0.0.1");
        assert_eq!(client_key(&headers, None, false), "unknown");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_key(&headers, Some(&peer), true), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_header_ignored_unless_trusted() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60), true);
        let peer = ConnectInfo("198.51.100.4:4000".parse::<SocketAddr>().unwrap());

        // Rotating the header does not buy a fresh budget.
        let mut throttled = 0;
        for hop in 0..5 {
            let mut headers = HeaderMap::new();
            let spoofed = format!("203.0.113.{}", hop);
            headers.insert("x-forwarded-for", HeaderValue::from_str(&spoofed).unwrap());

            let key = client_key(&headers, Some(&peer), false);
            assert_eq!(key, "198.51.100.4");
            if limiter.check(&key).is_err() {
                throttled += 1;
            }
        }
        assert_eq!(throttled, 3);
    }

    #[test]
    fn test_username_budget_spans_addresses() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60), true);

        assert!(limiter.check_username("alice").is_ok());
        assert!(limiter.check_username(" Alice").is_ok());
        assert!(limiter.check_username("ALICE").is_err());
        assert!(limiter.check_username("bob").is_ok());
    }

    #[test]
    fn test_tracked_keys_are_bounded() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), true);
        let start = Instant::now();

        for n in 0..10u64 {
            let at = start + Duration::from_millis(n);
            assert!(limiter.check_bounded(&format!("10.0.0.{}", n), at, 4).is_ok());
            assert!(limiter.windows.lock().len() <= 4);
        }

        // The most recent client is still tracked.
        let at = start + Duration::from_millis(10);
        assert!(limiter.check_bounded("10.0.0.9", at, 4).is_err());
    }
}
