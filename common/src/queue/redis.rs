// Redis connection handle and health check

use crate::config::RedisConfig;
use crate::errors::QueueError;
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

/// Redis connection wrapper shared by every queue handle in the process.
///
/// Acquired once at startup and injected into the scheduler, the worker
/// pool, and the API; the ConnectionManager reconnects on its own after
/// connection loss.
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
}

impl RedisPool {
    /// Create a new Redis connection pool
    #[instrument(skip(config), fields(redis_url = %config.url))]
    pub async fn new(config: &RedisConfig) -> Result<Self, QueueError> {
        info!("Initializing Redis connection pool");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            QueueError::Unavailable(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            QueueError::Unavailable(format!("Failed to create connection manager: {}", e))
        })?;

        info!("Redis connection pool initialized successfully");

        Ok(Self { manager })
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Health check - verify Redis connection is working
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.get_connection();

        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Unavailable(format!("Health check failed: {}", e)))?;

        if response != "PONG" {
            return Err(QueueError::Unavailable(format!(
                "Unexpected PING response: {}",
                response
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str) -> RedisConfig {
        RedisConfig {
            url: url.to_string(),
            key_prefix: "weather-email-test".to_string(),
        }
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_redis_pool_creation() {
        let pool = RedisPool::new(&test_config("redis://localhost:6379")).await;
        assert!(pool.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_redis_health_check() {
        let pool = RedisPool::new(&test_config("redis://localhost:6379"))
            .await
            .unwrap();
        assert!(pool.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_redis_pool_invalid_url() {
        let result = RedisPool::new(&test_config("redis://invalid-host:9999")).await;
        assert!(result.is_err());
    }
}
