//! Process-wide snapshot cache.
//!
//! One explicit key and a fixed TTL. Writes do not invalidate; readers may see
//! a snapshot up to one TTL old. Concurrent misses on the same key share a
//! single population.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::snapshot::InventorySnapshot;
use crate::store::StoreError;

/// Cache key for the inventory-wide snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey(String);

impl SnapshotKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotCache {
    inner: Cache<SnapshotKey, Arc<InventorySnapshot>>,
    key: SnapshotKey,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(key: SnapshotKey, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .name("inventory_snapshot")
            .max_capacity(1)
            .time_to_live(ttl)
            .build();
        Self { inner, key, ttl }
    }

    pub fn key(&self) -> &SnapshotKey {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached snapshot, or populate it with `build`.
    ///
    /// A failed build is not cached.
    pub async fn get_or_build<F>(&self, build: F) -> Result<Arc<InventorySnapshot>, StoreError>
    where
        F: Future<Output = Result<InventorySnapshot, StoreError>>,
    {
        if let Some(hit) = self.inner.get(&self.key).await {
            debug!(key = self.key.as_str(), generated_at = %hit.generated_at, "snapshot cache hit");
            return Ok(hit);
        }

        debug!(key = self.key.as_str(), "snapshot cache miss");
        self.inner
            .try_get_with(self.key.clone(), async move { build.await.map(Arc::new) })
            .await
            .map_err(|e| (*e).clone())
    }

    pub async fn invalidate(&self) {
        debug!(key = self.key.as_str(), "snapshot cache invalidated");
        self.inner.invalidate(&self.key).await;
    }
}
