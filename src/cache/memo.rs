//! Memoizing Cache Handle
//!
//! Shared, cloneable front of the [`CacheStore`] implementing
//! get-or-compute for data and resource operations.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{
    CacheKey, CacheStats, CacheStore, CallArgs, EntryKind, OperationSpec, SharedValue,
};
use crate::error::{CacheError, Result};

static GLOBAL_CACHE: OnceLock<MemoCache> = OnceLock::new();

// == Memo Cache ==
/// Thread-safe memoizing cache shared across sessions.
///
/// Clones share the same underlying store. Lookups and insertions each run
/// under the store's write lock; the compute function runs outside it, so
/// concurrent misses on one key may compute twice but only the last result
/// stays cached.
#[derive(Debug, Clone, Default)]
pub struct MemoCache {
    store: Arc<RwLock<CacheStore>>,
}

impl MemoCache {
    /// Creates an empty cache with no registered operations.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache, created empty on first use.
    pub fn global() -> &'static MemoCache {
        GLOBAL_CACHE.get_or_init(MemoCache::new)
    }

    /// Shared store, for background maintenance.
    pub fn store(&self) -> Arc<RwLock<CacheStore>> {
        Arc::clone(&self.store)
    }

    // == Register ==
    /// Registers an operation. Must happen once before the operation is used.
    pub async fn register<T: Send + Sync + 'static>(&self, spec: OperationSpec<T>) -> Result<()> {
        let meta = spec.into_meta()?;
        self.store.write().await.register(meta)
    }

    // == Get Or Compute ==
    /// Returns the cached result of a data operation, computing it on a miss.
    ///
    /// `compute` runs at most once per call. If it fails the error is
    /// returned unchanged and nothing is stored.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        operation: &str,
        args: &CallArgs,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = CacheKey::new(operation, args)?;

        {
            let mut store = self.store.write().await;
            store.operation(operation)?.check_call::<T>(EntryKind::Data)?;
            if let Some(cached) = store.lookup(&key) {
                if let Some(value) = cached.downcast_ref::<T>() {
                    return Ok(value.clone());
                }
            }
        }

        let value = compute().await?;
        self.store
            .write()
            .await
            .insert(key, Arc::new(value.clone()))?;
        Ok(value)
    }

    // == Get Or Create ==
    /// Returns the shared handle of a resource operation, creating it on a miss.
    ///
    /// Every caller reading the same key receives the same `Arc`. A cached
    /// resource failing its validator is dropped from the cache and a new
    /// one is created; the stale handle stays valid for anyone still holding it.
    pub async fn get_or_create<T, E, F, Fut>(
        &self,
        operation: &str,
        args: &CallArgs,
        create: F,
    ) -> std::result::Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = CacheKey::new(operation, args)?;

        {
            let mut store = self.store.write().await;
            store.operation(operation)?.check_call::<T>(EntryKind::Resource)?;
            if let Some(cached) = store.lookup(&key) {
                if let Ok(resource) = cached.downcast::<T>() {
                    return Ok(resource);
                }
            }
        }

        let resource = Arc::new(create().await?);
        let shared: SharedValue = resource.clone();
        self.store.write().await.insert(key, shared)?;
        debug!(operation, "Created cached resource");
        Ok(resource)
    }

    // == Contains ==
    /// Returns true if a live entry exists for the call. Never computes.
    pub async fn contains(&self, operation: &str, args: &CallArgs) -> Result<bool> {
        let key = CacheKey::new(operation, args)?;
        Ok(self.store.read().await.contains(&key))
    }

    /// Remaining lifetime of the cached result for the call, if it has a TTL.
    pub async fn ttl_remaining(
        &self,
        operation: &str,
        args: &CallArgs,
    ) -> Result<Option<Duration>> {
        let key = CacheKey::new(operation, args)?;
        Ok(self.store.read().await.ttl_remaining(&key))
    }

    // == Invalidate ==
    /// Removes the entry for exactly this call. Absent entries are a no-op.
    pub async fn invalidate(&self, operation: &str, args: &CallArgs) -> Result<bool> {
        let key = CacheKey::new(operation, args)?;
        Ok(self.store.write().await.invalidate(&key))
    }

    /// Removes every entry of `operation`.
    pub async fn invalidate_operation(&self, operation: &str) -> usize {
        self.store.write().await.invalidate_operation(operation)
    }

    // == Clear All ==
    /// Removes every entry across all operations.
    pub async fn clear_all(&self) -> usize {
        self.store.write().await.clear()
    }

    /// Drops every expired entry.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn len_for(&self, operation: &str) -> usize {
        self.store.read().await.len_for(operation)
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use thiserror::Error;

    #[derive(Debug, Error)]
    enum TestError {
        #[error(transparent)]
        Cache(#[from] CacheError),
        #[error("transient failure")]
        Transient,
    }

    async fn cache_with(spec: OperationSpec<u64>) -> MemoCache {
        let cache = MemoCache::new();
        cache.register(spec).await.unwrap();
        cache
    }

    #[tokio::test]
    async fn test_hit_skips_compute() {
        let cache = cache_with(OperationSpec::data("double")).await;
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let args = CallArgs::new().arg(21u64);

        for _ in 0..3 {
            let value: u64 = cache
                .get_or_compute("double", &args, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TestError>(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_failed_compute_is_not_stored() {
        let cache = cache_with(OperationSpec::data("flaky")).await;
        let args = CallArgs::new();

        let result = cache
            .get_or_compute("flaky", &args, || async { Err::<u64, _>(TestError::Transient) })
            .await;
        assert!(matches!(result, Err(TestError::Transient)));
        assert!(!cache.contains("flaky", &args).await.unwrap());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let cache = MemoCache::new();
        let result = cache
            .get_or_compute("missing", &CallArgs::new(), || async { Ok::<u64, TestError>(1) })
            .await;
        assert!(matches!(
            result,
            Err(TestError::Cache(CacheError::UnknownOperation(_)))
        ));
    }

    #[tokio::test]
    async fn test_unhashable_argument_never_computes() {
        let cache = cache_with(OperationSpec::data("op")).await;
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result = cache
            .get_or_compute("op", &CallArgs::new().arg(f64::NAN), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<u64, TestError>(1)
            })
            .await;

        assert!(matches!(
            result,
            Err(TestError::Cache(CacheError::UnhashableArgument(_)))
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_type_mismatch_before_compute() {
        let cache = cache_with(OperationSpec::data("op")).await;

        let result = cache
            .get_or_compute("op", &CallArgs::new(), || async {
                Ok::<String, TestError>("wrong".to_string())
            })
            .await;
        assert!(matches!(
            result,
            Err(TestError::Cache(CacheError::TypeMismatch { .. }))
        ));

        let result = cache
            .get_or_create("op", &CallArgs::new(), || async { Ok::<u64, TestError>(1) })
            .await;
        assert!(matches!(
            result,
            Err(TestError::Cache(CacheError::KindMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_resource_handle_is_shared() {
        let cache = MemoCache::new();
        cache
            .register(OperationSpec::<Vec<u8>>::resource("buffer"))
            .await
            .unwrap();
        let args = CallArgs::new();

        let first = cache
            .get_or_create("buffer", &args, || async { Ok::<_, TestError>(vec![1u8, 2, 3]) })
            .await
            .unwrap();
        let second = cache
            .get_or_create("buffer", &args, || async { Ok::<_, TestError>(vec![9u8]) })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, vec![1u8, 2, 3]);
        assert_eq!(Arc::strong_count(&first), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_recomputes() {
        let cache = cache_with(OperationSpec::data("op").ttl(Duration::from_secs(30))).await;
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let args = CallArgs::new();
        let compute = move || async move {
            Ok::<u64, TestError>(calls.fetch_add(1, Ordering::SeqCst) as u64)
        };

        assert_eq!(cache.get_or_compute("op", &args, compute).await.unwrap(), 0);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.ttl_remaining("op", &args).await.unwrap(), Some(Duration::ZERO));
        assert_eq!(cache.get_or_compute("op", &args, compute).await.unwrap(), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get_or_compute("op", &args, compute).await.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_leave_one_entry() {
        let cache = cache_with(OperationSpec::data("op")).await;
        let args = CallArgs::new().arg(7u32);

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let cache = cache.clone();
            let args = args.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("op", &args, move || async move {
                        tokio::task::yield_now().await;
                        Ok::<u64, TestError>(i)
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len_for("op").await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = cache_with(OperationSpec::data("op")).await;

        for n in 0..3u64 {
            cache
                .get_or_compute("op", &CallArgs::new().arg(n), move || async move {
                    Ok::<u64, TestError>(n)
                })
                .await
                .unwrap();
        }

        assert!(cache.invalidate("op", &CallArgs::new().arg(1u64)).await.unwrap());
        assert!(!cache.invalidate("op", &CallArgs::new().arg(1u64)).await.unwrap());
        assert_eq!(cache.len().await, 2);

        assert_eq!(cache.clear_all().await, 2);
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().await.invalidations, 3);
    }

    #[tokio::test]
    async fn test_global_is_shared() {
        let a = MemoCache::global();
        let b = MemoCache::global();
        assert!(Arc::ptr_eq(&a.store(), &b.store()));
    }
}
