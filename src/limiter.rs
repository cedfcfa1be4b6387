// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter keyed by client identifier.
//!
//! Tracks the timestamps of recent arrivals per client and rejects clients
//! that exceed the configured number of requests within the trailing
//! window. Every arrival is recorded, including rejected ones, so the
//! window keeps sliding while a client is blocked. Only arrivals are
//! counted; whether the downstream request succeeds is irrelevant.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Result of an admission check.
#[derive(Debug, Clone)]
pub enum Admission {
    /// Request is allowed
    Allowed {
        /// Remaining requests in the current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Time until the oldest recorded arrival leaves the window
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Thread-safe sliding-window rate limiter.
///
/// Stored timestamps are milliseconds since the Unix epoch. Entries older
/// than the window are pruned lazily on each access; a periodic [`sweep`]
/// drops clients whose whole history has aged out.
///
/// [`sweep`]: RateLimiter::sweep
pub struct RateLimiter {
    /// Configuration
    config: RateLimitConfig,
    /// Per-client arrival timestamps
    windows: Arc<RwLock<HashMap<String, Vec<i64>>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Record an arrival for `client_id` at `now_ms` and decide admission.
    ///
    /// The stored sequence is filtered to the trailing window, the current
    /// timestamp is appended, and the result is stored back. The arrival is
    /// recorded even when the decision is `Limited`.
    pub async fn admit(&self, client_id: &str, now_ms: i64) -> Admission {
        let window_ms = self.config.window_ms as i64;
        let mut windows = self.windows.write().await;
        let arrivals = windows.entry(client_id.to_string()).or_default();

        arrivals.retain(|&t| now_ms - t < window_ms);
        arrivals.push(now_ms);

        if arrivals.len() > self.config.max_requests as usize {
            // Oldest in-window arrival decides when capacity frees up.
            let oldest = arrivals[0];
            let retry_after = Duration::from_millis((window_ms - (now_ms - oldest)).max(0) as u64);
            warn!(
                client = %client_id,
                arrivals = arrivals.len(),
                retry_after_secs = retry_after.as_secs(),
                "Client rate limited"
            );
            Admission::Limited { retry_after }
        } else {
            let remaining = self.config.max_requests - arrivals.len() as u32;
            debug!(client = %client_id, remaining, "Request admitted");
            Admission::Allowed { remaining }
        }
    }

    /// Drop clients with no arrivals inside the window (should be called
    /// periodically).
    pub async fn sweep(&self, now_ms: i64) {
        let window_ms = self.config.window_ms as i64;
        let mut windows = self.windows.write().await;
        windows.retain(|_, arrivals| {
            arrivals
                .last()
                .is_some_and(|&newest| now_ms - newest < window_ms)
        });
    }
}

/// Derive the rate-limit bucket key for a request.
///
/// Prefers the first comma-separated entry of a forwarded-for header, then
/// the transport-level peer address. Requests with neither all share the
/// literal `"unknown"` bucket.
pub fn client_id(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> String {
    if let Some(forwarded) = forwarded_for {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    match peer {
        Some(addr) => addr.to_string(),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_ms: 60_000,
        })
    }

    #[tokio::test]
    async fn test_first_ten_allowed_eleventh_limited() {
        let limiter = limiter(10);

        for i in 0..10 {
            let result = limiter.admit("1.2.3.4", 1_000 + i).await;
            assert!(result.is_allowed(), "Request {} should be allowed", i + 1);
        }

        let result = limiter.admit("1.2.3.4", 1_010).await;
        assert!(matches!(result, Admission::Limited { .. }));
    }

    #[tokio::test]
    async fn test_window_resets_after_gap() {
        let limiter = limiter(2);

        assert!(limiter.admit("client", 0).await.is_allowed());
        assert!(limiter.admit("client", 10).await.is_allowed());
        assert!(!limiter.admit("client", 20).await.is_allowed());

        // More than a full window later the old arrivals have expired.
        let result = limiter.admit("client", 60_021).await;
        assert!(result.is_allowed());
    }

    #[tokio::test]
    async fn test_rejected_arrivals_keep_window_sliding() {
        let limiter = limiter(2);

        assert!(limiter.admit("client", 0).await.is_allowed());
        assert!(limiter.admit("client", 0).await.is_allowed());
        // Rejected, but still recorded at t=30s.
        assert!(!limiter.admit("client", 30_000).await.is_allowed());

        // At t=61s the two t=0 arrivals expired; in-window history is the
        // rejected t=30s arrival plus this one, which is within the limit.
        let result = limiter.admit("client", 61_000).await;
        assert!(result.is_allowed());
        // A third in-window arrival trips the limit again.
        assert!(!limiter.admit("client", 61_001).await.is_allowed());
    }

    #[tokio::test]
    async fn test_clients_tracked_independently() {
        let limiter = limiter(1);

        assert!(limiter.admit("1.2.3.4", 0).await.is_allowed());
        assert!(!limiter.admit("1.2.3.4", 1).await.is_allowed());
        assert!(limiter.admit("5.6.7.8", 2).await.is_allowed());
    }

    #[tokio::test]
    async fn test_retry_after_tracks_oldest_arrival() {
        let limiter = limiter(1);

        assert!(limiter.admit("client", 0).await.is_allowed());
        match limiter.admit("client", 45_000).await {
            Admission::Limited { retry_after } => {
                assert_eq!(retry_after, Duration::from_millis(15_000));
            }
            Admission::Allowed { .. } => panic!("Should be limited"),
        }
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_clients_only() {
        let limiter = limiter(10);

        limiter.admit("idle", 0).await;
        limiter.admit("active", 50_000).await;
        limiter.sweep(61_000).await;

        let windows = limiter.windows.read().await;
        assert!(!windows.contains_key("idle"));
        assert!(windows.contains_key("active"));
    }

    #[test]
    fn test_client_id_prefers_forwarded_for() {
        let peer = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));

        assert_eq!(client_id(Some("1.2.3.4"), peer), "1.2.3.4");
        assert_eq!(client_id(Some(" 1.2.3.4 , 9.9.9.9"), peer), "1.2.3.4");
    }

    #[test]
    fn test_client_id_falls_back_to_peer_then_unknown() {
        let peer = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));

        assert_eq!(client_id(None, peer), "10.0.0.1");
        assert_eq!(client_id(Some("  "), peer), "10.0.0.1");
        assert_eq!(client_id(None, None), "unknown");
        assert_eq!(client_id(Some(""), None), "unknown");
    }
}
