use crate::error::{SolverError, SolverResult};
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// Upstream completion provider configuration
    pub provider: ProviderConfig,
    /// Degree of input rewriting applied before cache-key derivation
    pub normalization_policy: NormalizationPolicy,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Solve-endpoint quota: maximum requests per window
    pub rate_limit_max_requests: u64,
    /// Solve-endpoint quota: fixed window length in seconds
    pub rate_limit_window_secs: u64,
    /// Caller IP exempt from the solve quota, if any
    pub owner_ip: Option<String>,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
    /// Maximum Redis connections
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
}

/// Which upstream vendor the gateway talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Groq,
    OpenAi,
}

/// Upstream completion provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Vendor selection
    pub kind: ProviderKind,
    /// API key for the selected vendor
    pub api_key: String,
    /// Model identifier sent to the vendor
    pub model: String,
    /// Base URL override, vendor default when unset
    pub base_url: Option<String>,
    /// Upstream request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Normalization policy applied before cache-key derivation and payload
/// construction. Mutually exclusive deployment modes, never blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizationPolicy {
    /// All rewrite rules; rewritten string is both cache key input and payload
    #[default]
    Full,
    /// Case folding and trim only
    Minimal,
    /// No rewriting; cache key derived from the untouched input
    Raw,
}

impl NormalizationPolicy {
    fn parse(value: &str) -> SolverResult<Self> {
        match value {
            "full" => Ok(NormalizationPolicy::Full),
            "minimal" => Ok(NormalizationPolicy::Minimal),
            "raw" | "exact" => Ok(NormalizationPolicy::Raw),
            other => Err(SolverError::ConfigError(format!(
                "Invalid NORMALIZATION_POLICY '{}' (expected full, minimal or raw)",
                other
            ))),
        }
    }
}

impl ProviderKind {
    fn parse(value: &str) -> SolverResult<Self> {
        match value {
            "gemini" => Ok(ProviderKind::Gemini),
            "groq" => Ok(ProviderKind::Groq),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(SolverError::ConfigError(format!(
                "Invalid PROVIDER '{}' (expected gemini, groq or openai)",
                other
            ))),
        }
    }

    /// Default model identifier for the vendor
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::OpenAi => "gpt-4o-mini",
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> SolverResult<Self> {
        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            tracing::warn!("Could not load .env file: {}", e);
        }

        let provider_kind = ProviderKind::parse(
            &env::var("PROVIDER").unwrap_or_else(|_| "gemini".to_string()),
        )?;

        let config = Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .map_err(|e| SolverError::ConfigError(format!("Invalid SERVER_PORT: {}", e)))?,
                request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                    .unwrap_or_else(|_| "60000".to_string())
                    .parse()
                    .map_err(|e| {
                        SolverError::ConfigError(format!("Invalid REQUEST_TIMEOUT_MS: {}", e))
                    })?,
                rate_limit_max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .map_err(|e| {
                        SolverError::ConfigError(format!("Invalid RATE_LIMIT_MAX_REQUESTS: {}", e))
                    })?,
                rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or_else(|_| "14400".to_string()) // 4 hours
                    .parse()
                    .map_err(|e| {
                        SolverError::ConfigError(format!("Invalid RATE_LIMIT_WINDOW_SECS: {}", e))
                    })?,
                owner_ip: env::var("OWNER_IP").ok().filter(|ip| !ip.is_empty()),
                max_request_size: env::var("MAX_REQUEST_SIZE")
                    .unwrap_or_else(|_| "32768".to_string()) // 32KB
                    .parse()
                    .map_err(|e| {
                        SolverError::ConfigError(format!("Invalid MAX_REQUEST_SIZE: {}", e))
                    })?,
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL")
                    .map_err(|_| SolverError::ConfigError("REDIS_URL is required".to_string()))?,
                max_connections: env::var("REDIS_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .map_err(|e| {
                        SolverError::ConfigError(format!("Invalid REDIS_MAX_CONNECTIONS: {}", e))
                    })?,
                connection_timeout_secs: env::var("REDIS_CONNECTION_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .map_err(|e| {
                        SolverError::ConfigError(format!(
                            "Invalid REDIS_CONNECTION_TIMEOUT_SECS: {}",
                            e
                        ))
                    })?,
            },
            provider: ProviderConfig {
                kind: provider_kind,
                api_key: env::var("PROVIDER_API_KEY")
                    .or_else(|_| env::var("GEMINI_API_KEY"))
                    .map_err(|_| {
                        SolverError::ConfigError(
                            "PROVIDER_API_KEY (or GEMINI_API_KEY) is required".to_string(),
                        )
                    })?,
                model: env::var("PROVIDER_MODEL")
                    .unwrap_or_else(|_| provider_kind.default_model().to_string()),
                base_url: env::var("PROVIDER_BASE_URL").ok().filter(|u| !u.is_empty()),
                request_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .map_err(|e| {
                        SolverError::ConfigError(format!("Invalid PROVIDER_TIMEOUT_SECS: {}", e))
                    })?,
            },
            normalization_policy: NormalizationPolicy::parse(
                &env::var("NORMALIZATION_POLICY").unwrap_or_else(|_| "full".to_string()),
            )?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> SolverResult<()> {
        if self.server.port == 0 {
            return Err(SolverError::ConfigError(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(SolverError::ConfigError(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.server.rate_limit_max_requests == 0 {
            return Err(SolverError::ConfigError(
                "Rate limit quota must be greater than 0".to_string(),
            ));
        }

        if self.server.rate_limit_window_secs == 0 {
            return Err(SolverError::ConfigError(
                "Rate limit window must be greater than 0".to_string(),
            ));
        }

        if !self.redis.url.starts_with("redis://") && !self.redis.url.starts_with("rediss://") {
            return Err(SolverError::ConfigError(
                "REDIS_URL must start with redis:// or rediss://".to_string(),
            ));
        }

        if self.provider.api_key.is_empty() {
            return Err(SolverError::ConfigError(
                "Provider API key cannot be empty".to_string(),
            ));
        }

        if self.provider.model.is_empty() {
            return Err(SolverError::ConfigError(
                "Provider model cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 10000,
                request_timeout_ms: 60000,
                rate_limit_max_requests: 5,
                rate_limit_window_secs: 14400, // 4 hours
                owner_ip: None,
                max_request_size: 32768, // 32KB
            },
            redis: RedisConfig {
                url: "".to_string(),
                max_connections: 10,
                connection_timeout_secs: 5,
            },
            provider: ProviderConfig {
                kind: ProviderKind::Gemini,
                api_key: "".to_string(),
                model: ProviderKind::Gemini.default_model().to_string(),
                base_url: None,
                request_timeout_secs: 60,
            },
            normalization_policy: NormalizationPolicy::Full,
        }
    }
}
