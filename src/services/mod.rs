//! Mock Services Module
//!
//! The cached operations of the caching walkthrough, registered explicitly
//! against a [`MemoCache`].
//!
//! # Operations
//! - `slow_sum` - data, no TTL
//! - `configurable_example` - data, 30s TTL, at most 5 entries
//! - `load_filtered_data` - data, keyed by category and minimum sales
//! - `load_mock_model` - resource
//! - `get_database_connection` - resource, validated by connection state

mod mock_db;
mod model;
mod sample;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::cache::{CallArgs, MemoCache, OperationSpec};
use crate::config::Config;
use crate::error::CacheError;

pub use mock_db::{ConnectionState, DbError, MockDatabase, QueryRow};
pub use model::ModelInfo;
pub use sample::{
    filter_sales, mock_sales_data, sum_below, ExampleData, SalesRecord, CATEGORIES,
};

pub const SLOW_SUM: &str = "slow_sum";
pub const CONFIGURABLE_EXAMPLE: &str = "configurable_example";
pub const LOAD_FILTERED_DATA: &str = "load_filtered_data";
pub const LOAD_MOCK_MODEL: &str = "load_mock_model";
pub const DATABASE_CONNECTION: &str = "get_database_connection";

const DATA_OPERATIONS: [&str; 3] = [SLOW_SUM, CONFIGURABLE_EXAMPLE, LOAD_FILTERED_DATA];
const RESOURCE_OPERATIONS: [&str; 2] = [LOAD_MOCK_MODEL, DATABASE_CONNECTION];

// == Service Error ==
/// Errors returned by the mock services.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Cache misuse, e.g. an unhashable argument
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The mock database refused the request
    #[error(transparent)]
    Database(#[from] DbError),
}

// == Delays ==
/// Simulated latencies of the mock services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delays {
    pub slow_sum: Duration,
    pub data_load: Duration,
    pub data_query: Duration,
    pub model_load: Duration,
    pub db_setup: Duration,
    pub db_connect: Duration,
    pub db_query: Duration,
}

impl Delays {
    /// Latencies matching the walkthrough's narration.
    pub fn realistic() -> Self {
        Self {
            slow_sum: Duration::from_secs(2),
            data_load: Duration::from_secs(1),
            data_query: Duration::from_millis(500),
            model_load: Duration::from_secs(3),
            db_setup: Duration::from_secs(1),
            db_connect: Duration::from_millis(700),
            db_query: Duration::from_millis(100),
        }
    }

    pub fn none() -> Self {
        Self {
            slow_sum: Duration::ZERO,
            data_load: Duration::ZERO,
            data_query: Duration::ZERO,
            model_load: Duration::ZERO,
            db_setup: Duration::ZERO,
            db_connect: Duration::ZERO,
            db_query: Duration::ZERO,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        if config.simulate_latency {
            Self::realistic()
        } else {
            Self::none()
        }
    }
}

// == Services ==
/// Mock services backed by a shared cache.
#[derive(Debug, Clone)]
pub struct Services {
    cache: MemoCache,
    delays: Delays,
}

impl Services {
    /// Registers every service operation on `cache`.
    ///
    /// Fails with `DuplicateOperation` if the cache already has them.
    pub async fn new(cache: MemoCache, delays: Delays) -> Result<Self, ServiceError> {
        cache.register(OperationSpec::<u64>::data(SLOW_SUM)).await?;
        cache
            .register(
                OperationSpec::<ExampleData>::data(CONFIGURABLE_EXAMPLE)
                    .ttl(Duration::from_secs(30))
                    .max_entries(5),
            )
            .await?;
        cache
            .register(OperationSpec::<Vec<SalesRecord>>::data(LOAD_FILTERED_DATA))
            .await?;
        cache
            .register(OperationSpec::<ModelInfo>::resource(LOAD_MOCK_MODEL))
            .await?;
        cache
            .register(
                OperationSpec::<MockDatabase>::resource(DATABASE_CONNECTION)
                    .validate(|db: &MockDatabase| Ok(db.is_connected())),
            )
            .await?;

        Ok(Self { cache, delays })
    }

    pub fn cache(&self) -> &MemoCache {
        &self.cache
    }

    /// Sum of `0..n`, computed slowly once per distinct `n`.
    pub async fn slow_sum(&self, n: u64) -> Result<u64, ServiceError> {
        let delay = self.delays.slow_sum;
        self.cache
            .get_or_compute(SLOW_SUM, &CallArgs::new().arg(n), move || async move {
                tokio::time::sleep(delay).await;
                Ok(sum_below(n))
            })
            .await
    }

    /// Small table per data type; cached 30s, at most 5 types at once.
    pub async fn configurable_example(&self, data_type: &str) -> Result<ExampleData, ServiceError> {
        let delay = self.delays.data_load;
        self.cache
            .get_or_compute(
                CONFIGURABLE_EXAMPLE,
                &CallArgs::new().arg(data_type),
                move || async move {
                    tokio::time::sleep(delay).await;
                    Ok(ExampleData::for_type(data_type))
                },
            )
            .await
    }

    /// Sales rows of one category above a sales threshold. Each combination
    /// of arguments is cached separately.
    pub async fn load_filtered_data(
        &self,
        category: &str,
        min_sales: u32,
    ) -> Result<Vec<SalesRecord>, ServiceError> {
        let delay = self.delays.data_query;
        let args = CallArgs::new()
            .kwarg("category_filter", category)
            .kwarg("min_sales", min_sales);
        self.cache
            .get_or_compute(LOAD_FILTERED_DATA, &args, move || async move {
                tokio::time::sleep(delay).await;
                Ok(filter_sales(category, min_sales))
            })
            .await
    }

    /// Loads the model once; every caller shares the same instance.
    pub async fn load_mock_model(&self) -> Result<Arc<ModelInfo>, ServiceError> {
        let delay = self.delays.model_load;
        self.cache
            .get_or_create(LOAD_MOCK_MODEL, &CallArgs::new(), move || async move {
                tokio::time::sleep(delay).await;
                info!("Mock model loaded");
                Ok(ModelInfo::sentiment_analyzer())
            })
            .await
    }

    /// Shared connection per URL. A closed connection fails validation and
    /// is replaced by a fresh one.
    pub async fn database(&self, db_url: &str) -> Result<Arc<MockDatabase>, ServiceError> {
        let delays = self.delays;
        self.cache
            .get_or_create(
                DATABASE_CONNECTION,
                &CallArgs::new().arg(db_url),
                move || async move {
                    MockDatabase::open(db_url, delays)
                        .await
                        .map_err(ServiceError::from)
                },
            )
            .await
    }

    /// Drops every cached data result ("Clear Data Cache").
    pub async fn clear_data_caches(&self) -> usize {
        let mut removed = 0;
        for operation in DATA_OPERATIONS {
            removed += self.cache.invalidate_operation(operation).await;
        }
        removed
    }

    /// Drops every cached resource ("Clear Model Cache").
    ///
    /// Handles already given out stay usable; closing them is up to their holders.
    pub async fn clear_resource_caches(&self) -> usize {
        let mut removed = 0;
        for operation in RESOURCE_OPERATIONS {
            removed += self.cache.invalidate_operation(operation).await;
        }
        removed
    }
}
