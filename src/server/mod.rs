use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{Html, Json, Response},
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use crate::cache::{CacheManager, RedisClient};
use crate::config::Config;
use crate::error::SolverError;
use crate::normalizer::Normalizer;
use crate::provider::build_provider;
use crate::solver::SolverService;
use crate::types::{
    ChatRequest, ChatResponse, DailyStatsResponse, SolveRequest, SolveResponse,
};
use crate::visitors::VisitorLog;

/// Main solver server structure
pub struct SolverServer {
    app: Router,
    config: Config,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Fixed-window quota tracking per caller IP
    rate_limiter: Arc<RateLimiter>,
    /// Solve pipeline (normalize, cache, provider)
    solver: Arc<SolverService>,
    /// Daily visitor log, absent when Redis is unavailable
    visitors: Option<Arc<VisitorLog>>,
}

/// Fixed-window rate limiter keyed by caller IP.
///
/// Each IP gets `max_requests` per `window`; the window resets as a whole
/// rather than sliding. An optional owner IP bypasses the quota entirely.
pub struct RateLimiter {
    /// Per-IP quota state
    ip_states: Mutex<HashMap<String, WindowState>>,
    /// Maximum requests per window
    max_requests: u64,
    /// Fixed window length
    window: Duration,
    /// Caller IP exempt from the quota
    owner_ip: Option<String>,
}

/// Quota state for a single IP
#[derive(Debug, Clone)]
struct WindowState {
    /// Requests seen in the current window
    count: u64,
    /// When the current window opened
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u64, window: Duration, owner_ip: Option<String>) -> Self {
        Self {
            ip_states: Mutex::new(HashMap::new()),
            max_requests,
            window,
            owner_ip,
        }
    }

    /// Check whether a request from this IP fits in its current window
    pub fn check_rate_limit(&self, client_ip: &str) -> bool {
        if let Some(owner) = &self.owner_ip {
            if client_ip.contains(owner.as_str()) {
                return true;
            }
        }

        let mut states = self.ip_states.lock().unwrap();
        let now = Instant::now();

        let state = states.entry(client_ip.to_string()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        // Open a fresh window once the old one has fully elapsed
        if now.duration_since(state.window_start) >= self.window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count >= self.max_requests {
            warn!("Rate limit exceeded for IP: {}", client_ip);
            return false;
        }

        state.count += 1;
        true
    }

    /// Clean up expired IP states to prevent memory growth
    pub fn cleanup_old_states(&self) {
        let mut states = self.ip_states.lock().unwrap();
        let now = Instant::now();
        let retention = self.window.saturating_mul(2);

        states.retain(|_, state| now.duration_since(state.window_start) < retention);
    }
}

impl SolverServer {
    /// Create a new solver server instance
    pub async fn new(config: Config) -> Result<Self, SolverError> {
        info!("Initializing solver server components...");

        // Redis backs both the solution cache and the visitor log. Losing it
        // disables caching and tracking but must not stop the service (the
        // gateway can still forward everything upstream).
        let redis = match RedisClient::new(config.redis.clone()).await {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Redis unavailable, caching and visitor tracking disabled: {}", e);
                None
            }
        };

        let cache = redis
            .as_ref()
            .map(|redis| Arc::new(CacheManager::new(redis.clone())));
        let visitors = redis
            .as_ref()
            .map(|redis| Arc::new(VisitorLog::new(redis.clone())));

        let provider = build_provider(&config.provider)?;
        info!(
            "Upstream provider: {} (model: {})",
            provider.name(),
            config.provider.model
        );

        let solver = Arc::new(SolverService::new(
            Normalizer::new(config.normalization_policy),
            provider,
            cache,
        ));

        let state = AppState {
            config: config.clone(),
            rate_limiter: Arc::new(RateLimiter::new(
                config.server.rate_limit_max_requests,
                Duration::from_secs(config.server.rate_limit_window_secs),
                config.server.owner_ip.clone(),
            )),
            solver,
            visitors,
        };

        let app = build_router(state.clone());

        // Periodic cleanup of expired rate-limiter windows
        let cleanup_state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                cleanup_state.rate_limiter.cleanup_old_states();
            }
        });

        info!("Solver server initialized successfully");
        Ok(SolverServer { app, config })
    }

    /// Run the HTTP server
    pub async fn run(self) -> Result<(), SolverError> {
        let bind_addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            SolverError::ConfigError(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;

        info!("HTTP server listening on {}", bind_addr);

        axum::serve(listener, self.app)
            .await
            .map_err(|e| SolverError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}

/// Assemble the router over a prepared state (shared with tests)
fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any)
        .max_age(Duration::from_secs(3600));

    // Only the solve endpoint carries the fixed-window quota; chat and
    // stats stay open like the rest of the surface
    let quota_routes = Router::new()
        .route("/api/solve", post(solve_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .merge(quota_routes)
        .route("/api/chat", post(chat_handler))
        .route("/api/daily-stats", get(daily_stats_handler))
        .route("/health", get(health_handler))
        .route("/", get(root_handler))
        .layer(RequestBodyLimitLayer::new(state.config.server.max_request_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            timeout_middleware,
        ))
        .layer(middleware::from_fn(security_middleware))
        .layer(cors)
        .with_state(state)
}

/// Middleware enforcing the solve-endpoint quota
async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let client_ip = extract_client_ip(request.headers());

    if !state.rate_limiter.check_rate_limit(&client_ip) {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "Rate limit exceeded".to_string(),
                message: format!(
                    "You have used all {} requests for this window. Please try again later.",
                    state.config.server.rate_limit_max_requests
                ),
            }),
        ));
    }

    Ok(next.run(request).await)
}

/// Middleware applying the request processing timeout
async fn timeout_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let client_ip = extract_client_ip(request.headers());

    match timeout(
        Duration::from_millis(state.config.server.request_timeout_ms),
        next.run(request),
    )
    .await
    {
        Ok(response) => Ok(response),
        Err(_) => {
            error!("Request timeout for IP: {}", client_ip);
            Err((
                StatusCode::GATEWAY_TIMEOUT,
                Json(ErrorResponse {
                    error: "Request timeout".to_string(),
                    message: "Request processing took too long".to_string(),
                }),
            ))
        }
    }
}

/// Middleware for security headers
async fn security_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}

/// Extract client IP from forwarded headers with a connection fallback.
/// The service runs behind a proxy, so x-forwarded-for wins when present.
fn extract_client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded_for.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                return first_ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return ip_str.to_string();
        }
    }

    "unknown".to_string()
}

/// Handler for the solve endpoint
async fn solve_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SolveRequest>,
) -> Result<Json<SolveResponse>, (StatusCode, Json<ErrorResponse>)> {
    if let Err(validation_error) = validate_solve_request(&request) {
        error!("Invalid solve request: {}", validation_error);
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid request".to_string(),
                message: validation_error,
            }),
        ));
    }

    // Visitor tracking is fire-and-forget; failures are logged, never
    // surfaced to the caller
    if let Some(visitors) = &state.visitors {
        let visitors = visitors.clone();
        let client_ip = extract_client_ip(&headers);
        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("Unknown")
            .to_string();

        tokio::spawn(async move {
            if let Err(e) = visitors
                .record(&VisitorLog::today(), &client_ip, &user_agent)
                .await
            {
                error!("Visitor tracking failed: {}", e);
            }
        });
    }

    match state.solver.solve(&request.prompt).await {
        Ok(response) => {
            info!("Solve completed (source: {:?})", response.source);
            Ok(Json(response))
        }
        Err(e) => Err(map_solver_error(e)),
    }
}

/// Handler for the chat endpoint
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid request".to_string(),
                message: "Message cannot be empty".to_string(),
            }),
        ));
    }

    match state.solver.chat(&request.message, &request.history).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => Err(map_solver_error(e)),
    }
}

/// Handler for the daily visitor stats endpoint
async fn daily_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<DailyStatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Some(visitors) = &state.visitors else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Service unavailable".to_string(),
                message: "Visitor tracking service unavailable".to_string(),
            }),
        ));
    };

    match visitors.daily_stats(10).await {
        Ok(stats) => Ok(Json(DailyStatsResponse {
            message: "Daily Unique User Count (Last 10 Days)".to_string(),
            stats,
        })),
        Err(e) => {
            error!("Failed to retrieve stats: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Stats failed".to_string(),
                    message: "Failed to retrieve stats".to_string(),
                }),
            ))
        }
    }
}

/// Handler for health check endpoint
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.solver.health_check().await {
        Ok(_) => "healthy".to_string(),
        Err(_) => "degraded".to_string(),
    };

    Json(HealthResponse {
        status,
        caching_enabled: state.solver.caching_enabled(),
        timestamp: chrono::Utc::now(),
    })
}

/// Plain status page at the service root
async fn root_handler(State(state): State<AppState>) -> Html<String> {
    let cache_status = if state.solver.caching_enabled() {
        "Connected (Caching Active)"
    } else {
        "Disconnected (Caching Disabled)"
    };

    Html(format!(
        "<h1>Math Solver API is Ready</h1>\
         <p>Status: Running</p>\
         <p>Cache: {}</p>",
        cache_status
    ))
}

/// Validate the solve request body
fn validate_solve_request(request: &SolveRequest) -> Result<(), String> {
    if request.prompt.trim().is_empty() {
        return Err("Prompt cannot be empty".to_string());
    }

    if request.prompt.len() > 2000 {
        return Err("Prompt too long (maximum 2000 characters allowed)".to_string());
    }

    if request.prompt.contains('\0') {
        return Err("Prompt contains invalid characters".to_string());
    }

    Ok(())
}

/// Map a solver error to an HTTP response, keeping quota exhaustion as a
/// distinct "try again later" condition
fn map_solver_error(e: SolverError) -> (StatusCode, Json<ErrorResponse>) {
    error!("Solve failed: {}", e);

    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = match &e {
        SolverError::UpstreamQuota => {
            "Daily quota exceeded. Please try again later.".to_string()
        }
        SolverError::UpstreamError(_) | SolverError::EmptyCompletion => {
            "Upstream provider temporarily unavailable".to_string()
        }
        SolverError::RedisError(_) | SolverError::CacheError(_) => {
            "Cache service temporarily unavailable".to_string()
        }
        SolverError::InvalidRequest(msg) => msg.clone(),
        _ => "Internal server error".to_string(),
    };

    (
        status,
        Json(ErrorResponse {
            error: "Solve failed".to_string(),
            message,
        }),
    )
}

/// Error response structure
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Health check response structure
#[derive(serde::Serialize, serde::Deserialize)]
struct HealthResponse {
    status: String,
    caching_enabled: bool,
    timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, NormalizationPolicy};
    use crate::error::SolverResult;
    use crate::provider::CompletionProvider;
    use crate::types::ChatTurn;
    use async_trait::async_trait;
    use axum_test::TestServer;

    /// Provider double returning a fixed answer
    struct StubProvider;

    #[async_trait]
    impl CompletionProvider for StubProvider {
        async fn complete(&self, _turns: &[ChatTurn]) -> SolverResult<String> {
            Ok("stub answer".to_string())
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn test_state(max_requests: u64) -> AppState {
        let mut config = Config::default();
        config.server.rate_limit_max_requests = max_requests;

        let solver = Arc::new(SolverService::new(
            Normalizer::new(NormalizationPolicy::Full),
            Arc::new(StubProvider),
            None,
        ));

        AppState {
            rate_limiter: Arc::new(RateLimiter::new(
                max_requests,
                Duration::from_secs(config.server.rate_limit_window_secs),
                config.server.owner_ip.clone(),
            )),
            solver,
            visitors: None,
            config,
        }
    }

    fn test_server(max_requests: u64) -> TestServer {
        TestServer::new(build_router(test_state(max_requests))).unwrap()
    }

    #[test]
    fn test_rate_limiter_enforces_quota() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60), None);

        assert!(limiter.check_rate_limit("1.2.3.4"));
        assert!(limiter.check_rate_limit("1.2.3.4"));
        assert!(limiter.check_rate_limit("1.2.3.4"));
        assert!(!limiter.check_rate_limit("1.2.3.4"));

        // Other IPs keep their own quota
        assert!(limiter.check_rate_limit("5.6.7.8"));
    }

    #[test]
    fn test_rate_limiter_window_reset() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10), None);

        assert!(limiter.check_rate_limit("1.2.3.4"));
        assert!(!limiter.check_rate_limit("1.2.3.4"));

        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.check_rate_limit("1.2.3.4"));
    }

    #[test]
    fn test_rate_limiter_owner_exempt() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), Some("9.9.9.9".to_string()));

        assert!(limiter.check_rate_limit("9.9.9.9"));
        assert!(limiter.check_rate_limit("9.9.9.9"));
        assert!(limiter.check_rate_limit("9.9.9.9"));
    }

    #[test]
    fn test_rate_limiter_cleanup() {
        let limiter = RateLimiter::new(1, Duration::from_millis(1), None);
        limiter.check_rate_limit("1.2.3.4");

        std::thread::sleep(Duration::from_millis(10));
        limiter.cleanup_old_states();

        assert!(limiter.ip_states.lock().unwrap().is_empty());
    }

    #[test]
    fn test_validate_solve_request() {
        let valid = SolveRequest {
            prompt: "integrate sin(x)".to_string(),
        };
        assert!(validate_solve_request(&valid).is_ok());

        let empty = SolveRequest {
            prompt: "   ".to_string(),
        };
        assert!(validate_solve_request(&empty).is_err());

        let too_long = SolveRequest {
            prompt: "x".repeat(2001),
        };
        assert!(validate_solve_request(&too_long).is_err());

        let null_byte = SolveRequest {
            prompt: "x\0y".to_string(),
        };
        assert!(validate_solve_request(&null_byte).is_err());
    }

    #[test]
    fn test_extract_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(extract_client_ip(&headers), "10.0.0.2");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(extract_client_ip(&headers), "203.0.113.7");
    }

    #[tokio::test]
    async fn test_root_and_health_endpoints() {
        let server = test_server(5);

        let response = server.get("/").await;
        response.assert_status_ok();
        assert!(response.text().contains("Math Solver API"));

        let response = server.get("/health").await;
        response.assert_status_ok();
        let health: serde_json::Value = response.json();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["caching_enabled"], false);
    }

    #[tokio::test]
    async fn test_solve_endpoint_happy_path() {
        let server = test_server(5);

        let response = server
            .post("/api/solve")
            .json(&serde_json::json!({"prompt": "a / a"}))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["text"], "stub answer");
        assert_eq!(body["source"], "api");
    }

    #[tokio::test]
    async fn test_solve_endpoint_rejects_empty_prompt() {
        let server = test_server(5);

        let response = server
            .post("/api/solve")
            .json(&serde_json::json!({"prompt": ""}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_solve_endpoint_rate_limited() {
        let server = test_server(2);

        for _ in 0..2 {
            let response = server
                .post("/api/solve")
                .json(&serde_json::json!({"prompt": "x^2"}))
                .await;
            response.assert_status_ok();
        }

        let response = server
            .post("/api/solve")
            .json(&serde_json::json!({"prompt": "x^2"}))
            .await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_chat_endpoint_not_rate_limited() {
        let server = test_server(1);

        for _ in 0..3 {
            let response = server
                .post("/api/chat")
                .json(&serde_json::json!({"message": "hello"}))
                .await;
            response.assert_status_ok();
        }
    }

    #[tokio::test]
    async fn test_daily_stats_unavailable_without_redis() {
        let server = test_server(5);

        let response = server.get("/api/daily-stats").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }
}
