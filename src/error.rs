use thiserror::Error;

/// Main error type for the solver service
#[derive(Debug, Error)]
pub enum SolverError {
    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Upstream provider quota exhausted (caller should retry later)
    #[error("Upstream quota exceeded")]
    UpstreamQuota,

    /// Upstream provider call failed
    #[error("Upstream provider error: {0}")]
    UpstreamError(String),

    /// Upstream provider returned no usable text
    #[error("Empty completion from upstream provider")]
    EmptyCompletion,

    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    RedisError(String),

    /// Cache operation error
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SolverError {
    /// Check if error is related to Redis
    pub fn is_redis_error(&self) -> bool {
        matches!(self, SolverError::RedisError(_) | SolverError::CacheError(_))
    }

    /// Check if the caller should be told to retry later
    pub fn is_retry_later(&self) -> bool {
        matches!(
            self,
            SolverError::UpstreamQuota | SolverError::RateLimitExceeded
        )
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            SolverError::InvalidRequest(_) => 400,
            SolverError::RateLimitExceeded => 429,
            SolverError::UpstreamQuota => 429,
            SolverError::UpstreamError(_) => 502,
            SolverError::EmptyCompletion => 502,
            SolverError::RedisError(_) => 500,
            SolverError::CacheError(_) => 500,
            SolverError::ConfigError(_) => 500,
            SolverError::IoError(_) => 500,
            SolverError::SerializationError(_) => 500,
            SolverError::Internal(_) => 500,
        }
    }
}

/// Result type alias for solver operations
pub type SolverResult<T> = Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SolverError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(SolverError::RateLimitExceeded.status_code(), 429);
        assert_eq!(SolverError::UpstreamQuota.status_code(), 429);
        assert_eq!(SolverError::UpstreamError("down".into()).status_code(), 502);
        assert_eq!(SolverError::RedisError("conn".into()).status_code(), 500);
    }

    #[test]
    fn test_retry_later_classification() {
        assert!(SolverError::UpstreamQuota.is_retry_later());
        assert!(SolverError::RateLimitExceeded.is_retry_later());
        assert!(!SolverError::UpstreamError("x".into()).is_retry_later());
        assert!(!SolverError::Internal("x".into()).is_retry_later());
    }
}
