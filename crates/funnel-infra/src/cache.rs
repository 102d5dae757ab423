//! In-process execution snapshot cache.
//!
//! Snapshots are stored as serialized JSON so a read never aliases the
//! engine's live context, matching what an out-of-process cache returns.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use funnel_core::repository::cache::{CacheError, ExecutionCache};
use funnel_types::execution::ExecutionContext;

struct Entry {
    json: String,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// `DashMap`-backed cache with per-entry TTL. Expired entries are dropped
/// lazily on read and by [`InMemoryExecutionCache::purge_expired`].
#[derive(Default)]
pub struct InMemoryExecutionCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryExecutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ExecutionCache for InMemoryExecutionCache {
    async fn get(&self, key: &str) -> Result<Option<ExecutionContext>, CacheError> {
        let (json, expired) = match self.entries.get(key) {
            Some(entry) => (entry.json.clone(), entry.is_expired(Instant::now())),
            None => return Ok(None),
        };
        // The shard guard is released above; removing while holding it deadlocks.
        if expired {
            self.entries.remove(key);
            return Ok(None);
        }
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    async fn set(&self, key: &str, context: &ExecutionContext, ttl_secs: u64) -> Result<(), CacheError> {
        let json = serde_json::to_string(context).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.entries.insert(
            key.to_string(),
            Entry {
                json,
                expires_at: Instant::now().checked_add(Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnel_types::execution::ExecutionStatus;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryExecutionCache::new();
        let mut ctx = ExecutionContext::new("welcome", None, HashMap::new());
        ctx.transition(ExecutionStatus::Running).unwrap();

        cache.set(&ctx.cache_key(), &ctx, 60).await.unwrap();
        let loaded = cache.get(&ctx.cache_key()).await.unwrap().unwrap();

        assert_eq!(loaded.id, ctx.id);
        assert_eq!(loaded.status, ExecutionStatus::Running);
        assert!(cache.get("execution:missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let cache = InMemoryExecutionCache::new();
        let ctx = ExecutionContext::new("welcome", None, HashMap::new());
        cache.set(&ctx.cache_key(), &ctx, 0).await.unwrap();

        assert!(cache.get(&ctx.cache_key()).await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = InMemoryExecutionCache::new();
        let a = ExecutionContext::new("a", None, HashMap::new());
        let b = ExecutionContext::new("b", None, HashMap::new());
        cache.set(&a.cache_key(), &a, 0).await.unwrap();
        cache.set(&b.cache_key(), &b, 3600).await.unwrap();

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_never_expires() {
        let cache = InMemoryExecutionCache::new();
        let ctx = ExecutionContext::new("welcome", None, HashMap::new());

        cache.set(&ctx.cache_key(), &ctx, u64::MAX).await.unwrap();

        assert_eq!(cache.purge_expired(), 0);
        let loaded = cache.get(&ctx.cache_key()).await.unwrap().unwrap();
        assert_eq!(loaded.id, ctx.id);
    }
}
