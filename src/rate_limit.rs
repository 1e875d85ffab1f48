use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

/// Sliding window in-memory rate limiter (process local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { store: Arc::new(DashMap::new()), enabled }
    }

    /// Records a hit for `key`; returns false once `limit` hits fall inside `window`.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled { return true; }
        let now = Instant::now();
        let mut hits = self.store.entry(key.to_string()).or_default();
        while hits.front().is_some_and(|t| now.duration_since(*t) >= window) {
            hits.pop_front();
        }
        if hits.len() >= limit { return false; }
        hits.push_back(now);
        true
    }

    /// Drops keys whose every hit is older than `window`.
    pub fn purge_idle(&self, window: Duration) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.store.retain(|_, hits| {
            let keep = hits.back().is_some_and(|t| now.duration_since(*t) < window);
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }
}

/// Per-endpoint limits, keyed by normalized email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub send_otp_limit: usize,
    pub send_otp_window: Duration,
    pub verify_otp_limit: usize,
    pub verify_otp_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            send_otp_limit: 3,
            send_otp_window: Duration::from_secs(600),
            verify_otp_limit: 5,
            verify_otp_window: Duration::from_secs(300),
        }
    }
}

impl RateLimitConfig {
    /// Unparseable values fall back to defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(var: &F) -> Self {
        let d = Self::default();
        let usize_var = |name: &str, default: usize| var(name).and_then(|v| v.parse().ok()).unwrap_or(default);
        let secs_var = |name: &str, default: Duration| {
            var(name).and_then(|v| v.parse().ok()).map(Duration::from_secs).unwrap_or(default)
        };
        Self {
            send_otp_limit: usize_var("RL_SEND_OTP_LIMIT", d.send_otp_limit),
            send_otp_window: secs_var("RL_SEND_OTP_WINDOW", d.send_otp_window),
            verify_otp_limit: usize_var("RL_VERIFY_OTP_LIMIT", d.verify_otp_limit),
            verify_otp_window: secs_var("RL_VERIFY_OTP_WINDOW", d.verify_otp_window),
        }
    }

    fn longest_window(&self) -> Duration {
        self.send_otp_window.max(self.verify_otp_window)
    }

    /// How often idle buckets are dropped: the shortest configured window.
    pub fn purge_every(&self) -> Duration {
        self.send_otp_window.min(self.verify_otp_window).max(Duration::from_secs(1))
    }
}

/// High level guard used by handlers.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self { Self { limiter, cfg } }
    pub fn allow_send_otp(&self, email: &str) -> bool { self.limiter.check(&format!("send-otp:{email}"), self.cfg.send_otp_limit, self.cfg.send_otp_window) }
    pub fn allow_verify_otp(&self, email: &str) -> bool { self.limiter.check(&format!("verify-otp:{email}"), self.cfg.verify_otp_limit, self.cfg.verify_otp_window) }
    pub fn purge_idle(&self) -> usize { self.limiter.purge_idle(self.cfg.longest_window()) }
}

/// Periodically drop idle rate-limit buckets. Runs until the task is dropped.
pub async fn purge_idle_every(limiter: RateLimiterFacade, every: Duration) {
    let mut tick = tokio::time::interval(every);
    loop {
        tick.tick().await;
        let n = limiter.purge_idle();
        if n > 0 {
            tracing::debug!(purged = n, "idle rate limit buckets dropped");
        }
    }
}
