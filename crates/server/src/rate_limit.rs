//! Token-bucket admission control keyed by client identity.
//!
//! Buckets live in a `DashMap`; the entry guard serializes refill, check and
//! consume for one identity while other identities proceed in parallel.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// The `rate_limit` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Bucket size: the burst a fresh client gets.
    pub capacity: u32,
    /// Tokens restored per second.
    pub refill_per_second: f64,
    /// Only paths starting with one of these are limited.
    pub protected_prefixes: Vec<String>,
    /// Drop buckets idle for longer than this. Unset keeps every bucket.
    pub idle_ttl_secs: Option<u64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            refill_per_second: 1.0,
            protected_prefixes: vec![
                "/api/search".to_string(),
                "/api/chat".to_string(),
                "/api/notes".to_string(),
            ],
            idle_ttl_secs: None,
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.refill_per_second.is_finite() && self.refill_per_second > 0.0) {
            anyhow::bail!(
                "rate_limit.refill_per_second must be a positive number, got {}",
                self.refill_per_second
            );
        }
        if self.idle_ttl_secs == Some(0) {
            anyhow::bail!("rate_limit.idle_ttl_secs must be at least 1 when set");
        }
        Ok(())
    }

    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl_secs.map(Duration::from_secs)
    }
}

/// A request was refused; retry after this many seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, Bucket>,
    retry_after_secs: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let refill = config.refill_per_second;
        let retry_after_secs = if refill > 0.0 && refill.is_finite() {
            ((1.0 / refill).ceil() as u64).max(1)
        } else {
            1
        };
        Self {
            config,
            buckets: DashMap::new(),
            retry_after_secs,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether `path` is subject to limiting at all.
    pub fn is_protected(&self, path: &str) -> bool {
        self.config
            .protected_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Admit or refuse one request from `identity` now.
    pub fn check(&self, identity: &str) -> Result<(), RateLimited> {
        self.check_at(identity, Instant::now())
    }

    /// Admit or refuse one request from `identity` at `now`.
    ///
    /// A new identity starts with a full bucket. A refusal consumes nothing.
    pub fn check_at(&self, identity: &str, now: Instant) -> Result<(), RateLimited> {
        let capacity = f64::from(self.config.capacity);
        let mut bucket = self
            .buckets
            .entry(identity.to_string())
            .or_insert(Bucket {
                tokens: capacity,
                last_refill: now,
            });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.config.refill_per_second).min(capacity);
        if now > bucket.last_refill {
            bucket.last_refill = now;
        }

        if bucket.tokens < 1.0 {
            return Err(RateLimited {
                retry_after_secs: self.retry_after_secs,
            });
        }
        bucket.tokens -= 1.0;
        Ok(())
    }

    /// Remove buckets untouched for longer than `ttl`; returns how many went.
    pub fn evict_idle_at(&self, now: Instant, ttl: Duration) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) <= ttl);
        before.saturating_sub(self.buckets.len())
    }

    pub fn tracked_identities(&self) -> usize {
        self.buckets.len()
    }
}
