use crate::config::RedisConfig;
use crate::error::{SolverError, SolverResult};
use fred::{
    clients::RedisPool,
    interfaces::{ClientLike, KeysInterface, SetsInterface},
    types::{Builder, RedisConfig as FredRedisConfig, SetOptions},
};
use std::time::Duration;
use tracing::{debug, info};

/// Redis client wrapper with connection pooling and error handling.
///
/// Shared by the solution cache and the visitor log; holds no domain logic,
/// only the raw key/value and set operations those layers need.
pub struct RedisClient {
    /// Fred Redis client with connection pooling
    client: RedisPool,
}

impl RedisClient {
    /// Create a new Redis client with TLS and cluster support
    pub async fn new(config: RedisConfig) -> SolverResult<Self> {
        info!("Initializing Redis client with URL: {}", &config.url);

        let redis_config = FredRedisConfig::from_url(&config.url)
            .map_err(|e| SolverError::RedisError(format!("Invalid Redis URL: {}", e)))?;

        let timeout_secs = config.connection_timeout_secs;
        let client = Builder::from_config(redis_config)
            .with_connection_config(|conn_config| {
                conn_config.connection_timeout = Duration::from_secs(timeout_secs);
            })
            .with_performance_config(|perf_config| {
                perf_config.auto_pipeline = true;
                perf_config.default_command_timeout = Duration::from_secs(timeout_secs);
            })
            .build_pool(config.max_connections as usize)
            .map_err(|e| SolverError::RedisError(format!("Failed to create Redis pool: {}", e)))?;

        client
            .connect()
            .await
            .map_err(|e| SolverError::RedisError(format!("Failed to connect to Redis: {}", e)))?;

        client
            .wait_for_connect()
            .await
            .map_err(|e| SolverError::RedisError(format!("Redis connection timeout: {}", e)))?;

        info!("Redis client connected successfully");

        Ok(RedisClient { client })
    }

    /// Get a string value by key
    pub async fn get_string(&self, key: &str) -> SolverResult<Option<String>> {
        debug!("Redis GET {}", key);

        self.client
            .get(key)
            .await
            .map_err(|e| SolverError::RedisError(format!("Failed to get key '{}': {}", key, e)))
    }

    /// Store a string value under a key, overwriting any previous value
    pub async fn set_string(&self, key: &str, value: &str) -> SolverResult<()> {
        debug!("Redis SET {}", key);

        let _: () = self
            .client
            .set(key, value, None, None, false)
            .await
            .map_err(|e| SolverError::RedisError(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    /// Store a string value only if the key does not exist yet.
    ///
    /// Returns `true` when the value was written and `false` when the key was
    /// already present. The duplicate-key outcome is a normal return value,
    /// never an error.
    pub async fn set_string_if_absent(&self, key: &str, value: &str) -> SolverResult<bool> {
        debug!("Redis SET NX {}", key);

        let outcome: Option<String> = self
            .client
            .set(key, value, None, Some(SetOptions::NX), false)
            .await
            .map_err(|e| SolverError::RedisError(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(outcome.is_some())
    }

    /// Add a member to a set, returning whether it was newly added
    pub async fn add_to_set(&self, key: &str, member: &str) -> SolverResult<bool> {
        debug!("Redis SADD {}", key);

        let added: u64 = self.client.sadd(key, member).await.map_err(|e| {
            SolverError::RedisError(format!("Failed to add to set '{}': {}", key, e))
        })?;

        Ok(added > 0)
    }

    /// Get the cardinality of a set (0 when the key does not exist)
    pub async fn set_size(&self, key: &str) -> SolverResult<u64> {
        debug!("Redis SCARD {}", key);

        self.client.scard(key).await.map_err(|e| {
            SolverError::RedisError(format!("Failed to read set size '{}': {}", key, e))
        })
    }

    /// Check Redis connectivity with a PING
    pub async fn health_check(&self) -> SolverResult<()> {
        let ping_result = tokio::time::timeout(
            Duration::from_secs(5),
            self.client.ping::<String>(),
        )
        .await;

        match ping_result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(SolverError::RedisError(format!(
                "Health check failed: {}",
                e
            ))),
            Err(_) => Err(SolverError::RedisError(
                "Health check timed out".to_string(),
            )),
        }
    }
}
