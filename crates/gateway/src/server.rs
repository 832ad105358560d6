//! Axum-based HTTP server for the reasoner service.

use axum::{
    extract::{Json, MatchedPath, Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use reasoner_core::{
    config::{ControllerConfig, ServerConfig},
    Error, Result, RunResult,
};

use crate::service::ReasonerService;

/// Shared application state.
pub struct AppState {
    pub service: Arc<ReasonerService>,
}

/// Gateway server.
pub struct GatewayServer {
    config: ServerConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
    enable_tracing: bool,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: ServerConfig, service: Arc<ReasonerService>) -> Self {
        Self {
            config,
            state: Arc::new(AppState { service }),
            metrics_handle: None,
            enable_tracing: true,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/v1/tasks", post(submit_handler))
            .route("/v1/tasks/:task_id", get(query_handler))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        router = router
            .layer(middleware::from_fn(track_metrics))
            .layer(cors_layer(&self.config.allowed_origins));

        if self.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::gateway(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutdown signal received");
            })
            .await
            .map_err(|e| Error::gateway(format!("Server error: {}", e)))?;

        Ok(())
    }
}

/// `*` allows any origin. Entries that are not valid header values are skipped.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    reasoner_telemetry::track_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Submit request.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Natural-language query.
    pub query: String,
    /// Optional per-run controller settings.
    #[serde(default)]
    pub config: Option<ControllerConfig>,
}

/// Submit response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: String,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl ErrorResponse {
    fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                code: "INVALID_REQUEST".to_string(),
                message: message.into(),
            }),
        )
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRequest>,
) -> Response {
    let query = payload.query.trim();
    if query.is_empty() {
        return ErrorResponse::bad_request("query must not be empty").into_response();
    }
    if let Some(config) = &payload.config {
        if config.max_reflect_time == 0 {
            return ErrorResponse::bad_request("max_reflect_time must be at least 1")
                .into_response();
        }
    }

    let task_id = state.service.submit(query, payload.config);
    tracing::info!(task_id = %task_id, query_len = query.len(), "Query accepted");

    (StatusCode::ACCEPTED, Json(SubmitResponse { task_id })).into_response()
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Json<RunResult> {
    Json(state.service.query(&task_id))
}
