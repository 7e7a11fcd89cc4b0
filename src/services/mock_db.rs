//! Mock Database Module
//!
//! A stand-in database connection with an explicit connection state machine:
//! `Disconnected -> Connected -> Disconnected`.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::Delays;

/// Rows returned by every query.
const QUERY_ROWS: u32 = 10;

// == Database Error ==
/// Errors reported by the connection itself, never by the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Database already connected: {0}")]
    AlreadyConnected(String),

    #[error("Database not connected: {0}")]
    NotConnected(String),
}

// == Connection State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected { since: DateTime<Utc> },
}

/// One row of a mock query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRow {
    pub id: u32,
    pub value: f64,
    pub timestamp: String,
}

// == Mock Database ==
/// Simulated database connection.
///
/// The state sits behind a mutex so a shared handle can be probed and
/// closed by any holder.
#[derive(Debug)]
pub struct MockDatabase {
    url: String,
    state: Mutex<ConnectionState>,
    delays: Delays,
}

impl MockDatabase {
    /// Sets up a connection object and connects it.
    pub async fn open(url: impl Into<String>, delays: Delays) -> Result<Self, DbError> {
        let db = Self {
            url: url.into(),
            state: Mutex::new(ConnectionState::Disconnected),
            delays,
        };
        tokio::time::sleep(delays.db_setup).await;
        db.connect().await?;
        Ok(db)
    }

    /// Moves `Disconnected -> Connected`. Connecting twice is an error.
    pub async fn connect(&self) -> Result<(), DbError> {
        self.ensure_disconnected()?;
        tokio::time::sleep(self.delays.db_connect).await;

        // Re-check: another holder may have connected during the handshake
        let mut state = self.state.lock();
        if matches!(*state, ConnectionState::Connected { .. }) {
            return Err(DbError::AlreadyConnected(self.url.clone()));
        }
        *state = ConnectionState::Connected { since: Utc::now() };
        info!(url = %self.url, "Database connected");
        Ok(())
    }

    /// Runs a query. Only valid while connected.
    pub async fn query(&self, sql: &str) -> Result<Vec<QueryRow>, DbError> {
        if !self.is_connected() {
            return Err(DbError::NotConnected(self.url.clone()));
        }
        debug!(url = %self.url, sql, "Running query");
        tokio::time::sleep(self.delays.db_query).await;

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Ok((0..QUERY_ROWS)
            .map(|id| QueryRow {
                id,
                value: f64::from(id) / f64::from(QUERY_ROWS),
                timestamp: timestamp.clone(),
            })
            .collect())
    }

    /// Moves to `Disconnected`. Closing a closed connection does nothing.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if matches!(*state, ConnectionState::Connected { .. }) {
            info!(url = %self.url, "Database connection closed");
        }
        *state = ConnectionState::Disconnected;
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.state.lock(), ConnectionState::Connected { .. })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// When the current connection was established, if connected.
    pub fn connection_time(&self) -> Option<DateTime<Utc>> {
        match *self.state.lock() {
            ConnectionState::Connected { since } => Some(since),
            ConnectionState::Disconnected => None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn ensure_disconnected(&self) -> Result<(), DbError> {
        if self.is_connected() {
            return Err(DbError::AlreadyConnected(self.url.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for MockDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_connected() {
            "Connected"
        } else {
            "Disconnected"
        };
        write!(f, "Database: {} ({})", self.url, status)
    }
}
