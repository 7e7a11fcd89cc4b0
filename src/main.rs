//! Memo Cache - caching walkthrough
//!
//! Runs the tutorial's caching scenarios against the process-wide cache and
//! logs timings and statistics.

use std::future::Future;
use std::time::Instant;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memo_cache::services::{Delays, Services, CATEGORIES, CONFIGURABLE_EXAMPLE};
use memo_cache::{spawn_cleanup_task, CallArgs, Config, MemoCache};

/// Entry point of the walkthrough.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Register the mock services on the global cache
/// 4. Start background TTL cleanup task
/// 5. Run the walkthrough, stopping early on Ctrl+C / SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memo_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Memo Cache walkthrough");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cleanup_interval={}s, db_url={}, sum_input={}, simulate_latency={}",
        config.cleanup_interval, config.db_url, config.sum_input, config.simulate_latency
    );

    let cache = MemoCache::global().clone();
    let services = Services::new(cache.clone(), Delays::from_config(&config))
        .await
        .context("registering mock services")?;

    let cleanup_handle = (config.cleanup_interval > 0)
        .then(|| spawn_cleanup_task(cache.clone(), config.cleanup_interval));

    tokio::select! {
        result = run_walkthrough(&services, &config) => result?,
        _ = shutdown_signal() => warn!("Walkthrough interrupted"),
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
    }

    let stats = cache.stats().await;
    info!(
        "Final cache statistics: {}",
        serde_json::to_string(&stats).context("serializing statistics")?
    );
    info!("Walkthrough complete");
    Ok(())
}

async fn run_walkthrough(services: &Services, config: &Config) -> anyhow::Result<()> {
    let cache = services.cache();

    // 1. Data caching: same argument, second call is a hit
    for attempt in 1..=2 {
        let label = format!("slow_sum call {}", attempt);
        let sum = timed(&label, services.slow_sum(config.sum_input)).await?;
        info!("slow_sum({}) = {}", config.sum_input, sum);
    }

    // 2. TTL + max_entries: six data types through a 5-entry cache
    for data_type in ["random", "sequential", "simple", "daily", "weekly", "monthly"] {
        let data = services.configurable_example(data_type).await?;
        info!("configurable_example({}) -> {} rows", data_type, data.rows());
    }
    info!(
        "configurable_example keeps {} entries",
        cache.len_for(CONFIGURABLE_EXAMPLE).await
    );
    let newest = CallArgs::new().arg("monthly");
    if let Some(remaining) = cache.ttl_remaining(CONFIGURABLE_EXAMPLE, &newest).await? {
        info!("configurable_example(monthly) expires in {:.1}s", remaining.as_secs_f64());
    }

    // 3. Multi-argument keys: each (category, min_sales) pair is its own entry
    let category = CATEGORIES[0];
    for min_sales in [100, 200, 100] {
        let label = format!("load_filtered_data({}, {})", category, min_sales);
        let rows = timed(&label, services.load_filtered_data(category, min_sales)).await?;
        info!("Found {} {} records with sales >= {}", rows.len(), category, min_sales);
    }

    // 4. Resource caching: the model is loaded once and shared
    for attempt in 1..=2 {
        let label = format!("load_mock_model call {}", attempt);
        let model = timed(&label, services.load_mock_model()).await?;
        info!("Model: {}", serde_json::to_string(&*model)?);
    }

    // 5. Validated resource: a closed connection is replaced
    let db = timed("connect to database", services.database(&config.db_url)).await?;
    info!("{} (connected at {:?})", db, db.connection_time());
    let rows = db.query("SELECT * FROM sample_table LIMIT 10").await?;
    info!("Query on {} returned {} rows", db.url(), rows.len());

    db.close();
    info!("{}", db);
    let db = timed("reconnect after close", services.database(&config.db_url)).await?;
    info!("{}", db);

    // 6. Cache management
    info!("Cleared {} data entries", services.clear_data_caches().await);
    info!("Cleared {} resource entries", services.clear_resource_caches().await);
    info!("Cleared {} remaining entries", cache.clear_all().await);

    Ok(())
}

/// Awaits `fut` and logs how long it took.
async fn timed<T, F: Future<Output = T>>(label: &str, fut: F) -> T {
    let start = Instant::now();
    let output = fut.await;
    info!("{} took {:.3}s", label, start.elapsed().as_secs_f64());
    output
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping...");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping...");
        }
    }
}
