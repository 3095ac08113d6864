//! Database connection pool management
//!
//! Provides PostgreSQL connection pooling using sqlx.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::Result;

/// Create a PostgreSQL connection pool and verify it works before returning.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!(
        max_connections,
        "creating database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(max_connections.min(5))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    health_check(&pool).await?;
    info!("database pool created successfully");

    Ok(pool)
}

/// Run a trivial query to make sure the pool can actually reach Postgres.
pub async fn health_check(pool: &PgPool) -> Result<()> {
    let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if row.0 == 1 {
        Ok(())
    } else {
        warn!("database health check returned unexpected value");
        Err(crate::error::Error::Database(sqlx::Error::Protocol(
            "health check failed".into(),
        )))
    }
}

/// (size, idle) for monitoring.
pub fn pool_stats(pool: &PgPool) -> (u32, usize) {
    (pool.size(), pool.num_idle())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_creation() {
        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            let result = create_pool(&database_url, 5).await;
            assert!(result.is_ok(), "failed to create pool: {:?}", result.err());

            let pool = result.unwrap();
            let (size, idle) = pool_stats(&pool);
            assert!(size > 0);
            assert!(idle <= size as usize);
        } else {
            println!("skipping test: DATABASE_URL not set");
        }
    }
}
