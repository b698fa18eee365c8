//! Connection pool, schema migrations and the adapter health ping
//!
//! The schema lives in the workspace `migrations/` directory and is embedded
//! into the binary at compile time.

use std::time::{Duration, Instant};

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use core_kernel::HealthCheckResult;

use crate::error::DatabaseError;

pub type DatabasePool = PgPool;

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Round trips slower than this report the adapter as degraded
pub const SLOW_ROUND_TRIP: Duration = Duration::from_millis(500);

/// Pool settings
///
/// Request handling holds a connection only for the duration of one port
/// call, so a small pool serves the whole API.
///
/// ```rust
/// use std::time::Duration;
/// use infra_db::DatabaseConfig;
///
/// let config = DatabaseConfig::new("postgres://localhost/gop")
///     .pool_size(2, 20)
///     .acquire_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_connections, 20);
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// How long a port call waits for a free connection
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            min_connections: 1,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
        }
    }

    /// Sets the pool bounds; `max` is raised to `min` when smaller
    pub fn pool_size(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max.max(min).max(1);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Opens the pool
///
/// # Errors
///
/// `DatabaseError::ConnectionFailed` when the first connection cannot be made.
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        "opening database pool"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("database pool ready");
    Ok(pool)
}

/// Applies pending migrations
///
/// # Errors
///
/// `DatabaseError::MigrationFailed` if a migration cannot be applied.
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    MIGRATOR.run(pool).await?;
    info!("database migrations applied");
    Ok(())
}

/// Round-trips `SELECT 1` on behalf of an adapter's health check
pub async fn ping(pool: &DatabasePool, adapter_id: &str) -> HealthCheckResult {
    let start = Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let elapsed = start.elapsed();

    classify(adapter_id, elapsed, result.map(|_| ()).map_err(|e| e.to_string()))
}

fn classify(adapter_id: &str, elapsed: Duration, result: Result<(), String>) -> HealthCheckResult {
    let latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(()) if elapsed > SLOW_ROUND_TRIP => HealthCheckResult::degraded(adapter_id, latency_ms, "slow database round trip"),
        Ok(()) => HealthCheckResult::healthy(adapter_id, latency_ms),
        Err(error) => HealthCheckResult::unhealthy(adapter_id, latency_ms, format!("database error: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::AdapterHealth;

    #[test]
    fn test_pool_size_keeps_bounds_ordered() {
        let config = DatabaseConfig::new("postgres://test").pool_size(5, 2);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_round_trip_classification() {
        let fast = classify("pg", Duration::from_millis(3), Ok(()));
        assert_eq!(fast.status, AdapterHealth::Healthy);

        let slow = classify("pg", Duration::from_secs(2), Ok(()));
        assert_eq!(slow.status, AdapterHealth::Degraded);

        let down = classify("pg", Duration::from_secs(10), Err("pool timed out".into()));
        assert_eq!(down.status, AdapterHealth::Unhealthy);
        assert!(down.message.unwrap_or_default().contains("pool timed out"));
    }
}
