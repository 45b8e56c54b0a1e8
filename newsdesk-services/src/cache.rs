//! Harvest caching
//!
//! The aggregator takes a cache as an explicit collaborator. Entries are
//! keyed by source id and live for the revalidation window attached to the
//! fetch that produced them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use newsdesk_core::NormalizedItem;
use newsdesk_sources::Harvest;

/// Cache of per-source harvests
#[async_trait]
pub trait HarvestCache: Send + Sync {
    /// Fresh items for `source_id`, if any
    async fn get(&self, source_id: &str) -> Option<Vec<NormalizedItem>>;

    /// Store a successful harvest
    async fn put(&self, harvest: &Harvest);
}

/// Cache entry with expiration
struct CacheEntry<T> {
    data: T,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory cache honouring each harvest's revalidation window
#[derive(Default)]
pub struct TtlHarvestCache {
    entries: RwLock<HashMap<String, CacheEntry<Vec<NormalizedItem>>>>,
}

impl TtlHarvestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl HarvestCache for TtlHarvestCache {
    async fn get(&self, source_id: &str) -> Option<Vec<NormalizedItem>> {
        let cache = self.entries.read().await;
        let entry = cache.get(source_id)?;
        if entry.is_expired() {
            return None;
        }
        debug!("Cache hit for source {}", source_id);
        Some(entry.data.clone())
    }

    async fn put(&self, harvest: &Harvest) {
        let mut cache = self.entries.write().await;
        // Drop stale entries while we hold the write lock
        cache.retain(|_, entry| !entry.is_expired());
        cache.insert(
            harvest.source_id.clone(),
            CacheEntry::new(harvest.items.clone(), harvest.revalidate_after),
        );
    }
}
