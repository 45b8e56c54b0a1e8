//! Bounded concurrency limiter for article-page fetches
//!
//! Caps how many fallback page requests are in flight at once across all
//! sources. Excess callers queue in FIFO order until a permit frees up.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

use crate::error::SourceError;

/// Concurrency limiter shared by every media resolver in a cycle
#[derive(Debug)]
pub struct FetchLimiter {
    semaphore: Semaphore,
    max_concurrent: usize,
    /// Name for logging purposes
    name: String,
    /// Counter for debugging - total requests processed
    total_requests: AtomicU64,
    /// Counter for debugging - requests that had to queue
    waited_requests: AtomicU64,
}

impl FetchLimiter {
    /// Create a limiter allowing `max_concurrent` requests at once (minimum 1)
    pub fn new(max_concurrent: usize, name: &str) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            name: name.to_string(),
            total_requests: AtomicU64::new(0),
            waited_requests: AtomicU64::new(0),
        }
    }

    /// Wait for a free slot. The slot is released when the permit drops.
    ///
    /// tokio's semaphore is fair, so queued callers are served first-come
    /// first-served.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, SourceError> {
        let request_num = self.total_requests.fetch_add(1, Ordering::Relaxed) + 1;

        if let Ok(permit) = self.semaphore.try_acquire() {
            return Ok(permit);
        }

        self.waited_requests.fetch_add(1, Ordering::Relaxed);
        debug!(
            "[FETCH_LIMITER:{}] #{} QUEUED - {} requests in flight",
            self.name, request_num, self.max_concurrent
        );

        self.semaphore
            .acquire()
            .await
            .map_err(|_| SourceError::RequestFailed(format!("limiter {} closed", self.name)))
    }

    /// Number of free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Get statistics about this limiter (for debugging)
    pub fn stats(&self) -> FetchLimiterStats {
        FetchLimiterStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            waited_requests: self.waited_requests.load(Ordering::Relaxed),
            max_concurrent: self.max_concurrent,
            name: self.name.clone(),
        }
    }
}

/// Statistics about limiter usage
#[derive(Debug, Clone)]
pub struct FetchLimiterStats {
    pub total_requests: u64,
    pub waited_requests: u64,
    pub max_concurrent: usize,
    pub name: String,
}
