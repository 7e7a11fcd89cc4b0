//! Integration Tests for the Memoizing Cache
//!
//! Exercises the public API end to end: registration, get-or-compute,
//! expiry, eviction, invalidation and the mock services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use memo_cache::cache::{CacheStats, CallArgs, MemoCache, OperationSpec};
use memo_cache::services::{Delays, Services, DATABASE_CONNECTION};
use memo_cache::CacheError;
use thiserror::Error;

// == Helper Types ==

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("service temporarily unavailable")]
    Unavailable,
}

fn slow_sum(n: u64) -> u64 {
    (0..n).sum()
}

async fn registered(spec: OperationSpec<u64>) -> MemoCache {
    let cache = MemoCache::new();
    cache.register(spec).await.unwrap();
    cache
}

// == Hit / Miss ==

#[tokio::test]
async fn test_slow_sum_scenario() {
    let cache = registered(OperationSpec::data("slow_sum")).await;
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let args = CallArgs::new().arg(1000u64);

    let first: u64 = cache
        .get_or_compute("slow_sum", &args, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, DemoError>(slow_sum(1000))
        })
        .await
        .unwrap();
    assert_eq!(first, 499_500);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let second: u64 = cache
        .get_or_compute("slow_sum", &args, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, DemoError>(slow_sum(1000))
        })
        .await
        .unwrap();
    assert_eq!(second, 499_500);
    assert_eq!(counter.load(Ordering::SeqCst), 1, "hit must not recompute");
}

#[tokio::test]
async fn test_flaky_scenario() {
    let cache = registered(OperationSpec::data("flaky")).await;
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let args = CallArgs::new();
    let flaky = move || async move {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(DemoError::Unavailable)
        } else {
            Ok(42u64)
        }
    };

    let first = cache.get_or_compute("flaky", &args, flaky).await;
    assert!(matches!(first, Err(DemoError::Unavailable)));
    assert!(!cache.contains("flaky", &args).await.unwrap());

    let second = cache.get_or_compute("flaky", &args, flaky).await.unwrap();
    assert_eq!(second, 42);
    assert!(cache.contains("flaky", &args).await.unwrap());

    // Stored now: a third call does not run the function
    let third = cache.get_or_compute("flaky", &args, flaky).await.unwrap();
    assert_eq!(third, 42);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_different_arguments_are_separate_entries() {
    let cache = MemoCache::new();
    cache
        .register(OperationSpec::<String>::data("load_filtered_data"))
        .await
        .unwrap();

    let load = |category: &'static str, min_sales: u32| {
        let cache = cache.clone();
        async move {
            let args = CallArgs::new()
                .kwarg("category", category)
                .kwarg("min_sales", min_sales);
            cache
                .get_or_compute("load_filtered_data", &args, move || async move {
                    Ok::<_, DemoError>(format!("{}>={}", category, min_sales))
                })
                .await
                .unwrap()
        }
    };

    assert_eq!(load("Electronics", 100).await, "Electronics>=100");
    assert_eq!(load("Electronics", 200).await, "Electronics>=200");
    assert_eq!(load("Electronics", 100).await, "Electronics>=100");

    let stats: CacheStats = cache.stats().await;
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.total_entries, 2);
}

// == TTL ==

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_causes_recompute() {
    let cache = registered(OperationSpec::data("ttl").ttl(Duration::from_secs(30))).await;
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let args = CallArgs::new().arg("random");
    let compute = move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<u64, DemoError>(7)
    };

    cache.get_or_compute("ttl", &args, compute).await.unwrap();
    tokio::time::advance(Duration::from_secs(10)).await;
    cache.get_or_compute("ttl", &args, compute).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(21)).await;
    cache.get_or_compute("ttl", &args, compute).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().await.expirations, 1);
}

// == Capacity ==

#[tokio::test]
async fn test_fifo_eviction_scenario() {
    let cache = registered(OperationSpec::data("bounded").max_entries(2)).await;

    for name in ["A", "B", "C"] {
        cache
            .get_or_compute("bounded", &CallArgs::new().arg(name), || async {
                Ok::<u64, DemoError>(1)
            })
            .await
            .unwrap();
    }

    assert!(!cache.contains("bounded", &CallArgs::new().arg("A")).await.unwrap());
    assert!(cache.contains("bounded", &CallArgs::new().arg("B")).await.unwrap());
    assert!(cache.contains("bounded", &CallArgs::new().arg("C")).await.unwrap());
    assert_eq!(cache.stats().await.evictions, 1);
}

// == Invalidation ==

#[tokio::test]
async fn test_invalidate_single_key() {
    let cache = registered(OperationSpec::data("op")).await;
    for n in 0..3u64 {
        cache
            .get_or_compute("op", &CallArgs::new().arg(n), move || async move {
                Ok::<u64, DemoError>(n)
            })
            .await
            .unwrap();
    }

    assert!(cache.invalidate("op", &CallArgs::new().arg(1u64)).await.unwrap());

    assert!(cache.contains("op", &CallArgs::new().arg(0u64)).await.unwrap());
    assert!(!cache.contains("op", &CallArgs::new().arg(1u64)).await.unwrap());
    assert!(cache.contains("op", &CallArgs::new().arg(2u64)).await.unwrap());
}

#[tokio::test]
async fn test_invalidate_absent_is_noop() {
    let cache = registered(OperationSpec::data("op")).await;

    assert!(!cache.invalidate("op", &CallArgs::new().arg(9u64)).await.unwrap());
    assert!(!cache.invalidate("unknown", &CallArgs::new()).await.unwrap());
    assert_eq!(cache.invalidate_operation("unknown").await, 0);
    assert_eq!(cache.clear_all().await, 0);
}

#[tokio::test]
async fn test_invalidate_with_unhashable_argument() {
    let cache = registered(OperationSpec::data("op")).await;

    let result = cache.invalidate("op", &CallArgs::new().arg(f64::NAN)).await;
    assert!(matches!(result, Err(CacheError::UnhashableArgument(_))));
}

#[tokio::test]
async fn test_clear_all_makes_everything_miss() {
    let cache = MemoCache::new();
    cache.register(OperationSpec::<u64>::data("a")).await.unwrap();
    cache.register(OperationSpec::<u64>::data("b")).await.unwrap();

    for op in ["a", "b"] {
        cache
            .get_or_compute(op, &CallArgs::new(), || async { Ok::<u64, DemoError>(1) })
            .await
            .unwrap();
    }

    assert_eq!(cache.clear_all().await, 2);
    assert!(!cache.contains("a", &CallArgs::new()).await.unwrap());
    assert!(!cache.contains("b", &CallArgs::new()).await.unwrap());
}

// == Services ==

#[tokio::test]
async fn test_services_database_lifecycle() {
    let services = Services::new(MemoCache::new(), Delays::none()).await.unwrap();
    let url = "postgresql://localhost:5432/mydb";

    let db = services.database(url).await.unwrap();
    assert_eq!(db.query("SELECT 1").await.unwrap().len(), 10);

    // Same URL, same live connection
    let again = services.database(url).await.unwrap();
    assert!(Arc::ptr_eq(&db, &again));

    // A different URL is a separate resource
    let other = services.database("postgresql://replica:5432/mydb").await.unwrap();
    assert!(!Arc::ptr_eq(&db, &other));
    assert_eq!(services.cache().len_for(DATABASE_CONNECTION).await, 2);

    db.close();
    let fresh = services.database(url).await.unwrap();
    assert!(fresh.is_connected());
    assert!(!Arc::ptr_eq(&db, &fresh));
}
