use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Coarse per-process request throttle keyed by client IP.
///
/// Windows are fixed intervals, so the limit is approximate at window edges,
/// and all counts reset on process restart. Good enough to blunt abuse; not
/// an exact quota.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    enabled: bool,
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                enabled: config.enabled,
                max_requests: config.max_requests,
                window: Duration::from_secs(config.window_secs),
                windows: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        if !self.inner.enabled {
            return true;
        }

        let mut windows = self
            .inner
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let window = windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.inner.window {
            window.started = now;
            window.count = 0;
        }

        window.count += 1;
        window.count <= self.inner.max_requests
    }
}

/// Middleware rejecting over-limit clients with 429.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.limiter.check(ip) {
        return Err(ApiError::too_many_requests(
            "Too many requests from this IP, please try again later.",
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            max_requests: max,
            window_secs,
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn allows_up_to_max_then_rejects() {
        let limiter = limiter(3, 60);
        let now = Instant::now();

        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));
    }

    #[test]
    fn counts_are_per_ip() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(2), now));
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let limiter = limiter(1, 1);
        let start = Instant::now();

        assert!(limiter.check_at(ip(1), start));
        assert!(!limiter.check_at(ip(1), start));
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(2)));
    }

    #[test]
    fn disabled_limiter_never_rejects() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            max_requests: 0,
            window_secs: 1,
        });
        assert!(limiter.check_at(ip(1), Instant::now()));
    }
}
