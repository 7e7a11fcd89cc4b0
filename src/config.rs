//! Configuration Module
//!
//! Handles loading the demo's configuration from environment variables.

use std::env;

/// Demo configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Background cleanup task interval in seconds, 0 disables it
    pub cleanup_interval: u64,
    /// Connection string handed to the mock database
    pub db_url: String,
    /// Input of the `slow_sum` walkthrough
    pub sum_input: u64,
    /// Whether mock services sleep to imitate slow work
    pub simulate_latency: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `DB_URL` - Mock database URL (default: postgresql://localhost:5432/mydb)
    /// - `SUM_INPUT` - Argument for slow_sum (default: 1000)
    /// - `SIMULATE_LATENCY` - true/false (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
            db_url: env::var("DB_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.db_url),
            sum_input: env::var("SUM_INPUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sum_input),
            simulate_latency: env::var("SIMULATE_LATENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.simulate_latency),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cleanup_interval: 1,
            db_url: "postgresql://localhost:5432/mydb".to_string(),
            sum_input: 1000,
            simulate_latency: true,
        }
    }
}
