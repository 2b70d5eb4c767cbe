//! Semaphore-backed limiter
//!
//! One instance bounds in-flight remote calls, another bounds how many
//! comparators run at once during analysis.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ConcurrencyConfig;

/// Permit count used when limiting is disabled
const UNLIMITED_PERMITS: usize = 1_000_000;

#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    /// Shows up in debug logs ("requests", "comparators")
    name: &'static str,
    semaphore: Arc<Semaphore>,
    max_permits: usize,
    enabled: bool,
    acquired: Arc<AtomicU64>,
    waited: Arc<AtomicU64>,
}

impl ConcurrencyLimiter {
    pub fn new(name: &'static str, max_permits: usize, enabled: bool) -> Self {
        let max_permits = if enabled {
            max_permits.clamp(1, UNLIMITED_PERMITS)
        } else {
            UNLIMITED_PERMITS
        };

        Self {
            name,
            semaphore: Arc::new(Semaphore::new(max_permits)),
            max_permits,
            enabled,
            acquired: Arc::new(AtomicU64::new(0)),
            waited: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Limiter for remote calls
    pub fn for_requests(config: &ConcurrencyConfig) -> Self {
        Self::new("requests", config.max_concurrent_requests, config.enabled)
    }

    /// Limiter for the comparator worker pool
    pub fn for_comparators(config: &ConcurrencyConfig) -> Self {
        Self::new("comparators", config.max_concurrent_comparators, config.enabled)
    }

    /// Wait for a permit; it is released on drop. `None` only if the
    /// semaphore was closed, in which case the caller runs unthrottled.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        if self.enabled && self.semaphore.available_permits() == 0 {
            self.waited.fetch_add(1, Ordering::Relaxed);
            debug!("Limiter '{}' saturated ({} permits), waiting", self.name, self.max_permits);
        }

        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        self.acquired.fetch_add(1, Ordering::Relaxed);
        Some(permit)
    }

    pub fn available_permits(&self) -> usize {
        if !self.enabled {
            return usize::MAX;
        }
        self.semaphore.available_permits()
    }

    pub fn max_permits(&self) -> usize {
        self.max_permits
    }

    pub fn stats(&self) -> ConcurrencyStats {
        ConcurrencyStats {
            available_permits: self.available_permits(),
            max_permits: self.max_permits,
            acquired: self.acquired.load(Ordering::Relaxed),
            waited: self.waited.load(Ordering::Relaxed),
            enabled: self.enabled,
        }
    }
}

/// Point-in-time counters of a limiter
#[derive(Debug, Clone)]
pub struct ConcurrencyStats {
    pub available_permits: usize,
    pub max_permits: usize,
    /// Permits handed out since creation
    pub acquired: u64,
    /// Acquisitions that found the limiter saturated
    pub waited: u64,
    pub enabled: bool,
}

impl ConcurrencyStats {
    pub fn in_use(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        self.max_permits.saturating_sub(self.available_permits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_disabled_limiter_never_blocks() {
        let limiter = ConcurrencyLimiter::new("requests", 2, false);

        let mut held = Vec::new();
        for _ in 0..50 {
            held.push(limiter.acquire().await);
        }
        assert!(held.iter().all(Option::is_some));
        assert_eq!(limiter.available_permits(), usize::MAX);
        assert_eq!(limiter.stats().in_use(), 0);
        assert_eq!(limiter.stats().waited, 0);
    }

    #[tokio::test]
    async fn test_saturated_limiter_waits_for_release() {
        let limiter = ConcurrencyLimiter::new("comparators", 1, true);
        let first = limiter.acquire().await;
        assert_eq!(limiter.available_permits(), 0);

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.is_some() })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(first);
        let acquired = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(acquired);

        let stats = limiter.stats();
        assert_eq!(stats.acquired, 2);
        assert_eq!(stats.waited, 1);
    }

    #[tokio::test]
    async fn test_stats_track_permits_in_use() {
        let limiter = ConcurrencyLimiter::new("requests", 3, true);
        let _a = limiter.acquire().await;
        let _b = limiter.acquire().await;

        let stats = limiter.stats();
        assert_eq!(stats.available_permits, 1);
        assert_eq!(stats.in_use(), 2);
    }

    #[test]
    fn test_limiters_from_config() {
        let config = ConcurrencyConfig {
            max_concurrent_requests: 20,
            max_concurrent_comparators: 0,
            max_parallel_lookups: 4,
            enabled: true,
        };

        assert_eq!(ConcurrencyLimiter::for_requests(&config).max_permits(), 20);
        // A zero limit would deadlock analysis
        assert_eq!(ConcurrencyLimiter::for_comparators(&config).max_permits(), 1);
    }
}
