//! # Bilan HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET|POST /assessments` - List or create assessments
//! - `GET /assessments/{id}` - Get an assessment
//! - `GET /assessments/{id}/parcours` - Gate state and phase progress
//! - `POST /assessments/{id}/phases/{phase}/complete` - Complete a phase
//! - `POST /assessments/{id}/archive` - Archive a completed assessment
//! - `GET /assessments/{id}/draft` - Get the wizard draft
//! - `PUT /assessments/{id}/draft/steps/{step}` - Merge a partial step payload
//! - `GET /assessments/{id}/draft/completion` - Step completion
//! - `GET /assessments/{id}/draft/summary` - Draft summary
//! - `GET /assessments/{id}/draft/export` - Export bundle (redacted by default)
//! - `GET|POST /assessments/{id}/answers` - List or record answers
//!
//! ## Security Configuration
//!
//! - `BILAN_CORS_ORIGINS` / `[cors] origins`: allowed origins, or "*" for all
//!   (default: localhost only)
//! - `BILAN_RATE_LIMIT` / `[limits] rate_limit`: requests per second (default: 100, 0 to disable)
//! - `BILAN_API_KEY` / `[auth] api_key`: if set, requires Bearer token authentication
//!   on every route except `/health`

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{ACTOR_HEADER, Actor};
pub use types::{
    ApiError, AssessmentResponse, CreateAssessmentRequest, DraftResponse, ErrorResponse,
    ExportQuery, HealthResponse, RecordAnswerRequest, SaveStepRequest, SaveStepResponse,
};

use crate::config::BilanConfig;
use auth::ApiKey;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use bilan_core::{BilanError, ProgressionService};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The progression service.
    pub service: Arc<RwLock<ProgressionService>>,
    /// Router configuration (limits, CORS, auth).
    pub config: Arc<BilanConfig>,
}

impl AppState {
    /// Create app state with an explicit configuration.
    #[must_use]
    pub fn with_config(service: ProgressionService, config: BilanConfig) -> Self {
        Self {
            service: Arc::new(RwLock::new(service)),
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const ALLOWED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

fn allowed_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(ACTOR_HEADER),
    ]
}

/// Build the CORS layer from configured origins.
///
/// - `["*"]`: allows all origins (development only)
/// - not set: localhost only
/// - otherwise: the listed origins
fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    match origins {
        Some([wildcard]) if wildcard == "*" => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", origin);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(ALLOWED_METHODS)
                    .allow_headers(allowed_headers())
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(allowed_headers())
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication (if an API key is configured; not on `/health`)
/// 6. Actor resolution (not on `/health`)
pub fn create_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    let cors = build_cors_layer(config.cors.origins.as_deref());

    let mut assessments = Router::new()
        .route(
            "/assessments",
            get(handlers::list_assessments_handler).post(handlers::create_assessment_handler),
        )
        .route("/assessments/{id}", get(handlers::get_assessment_handler))
        .route("/assessments/{id}/parcours", get(handlers::parcours_handler))
        .route(
            "/assessments/{id}/phases/{phase}/complete",
            post(handlers::complete_phase_handler),
        )
        .route("/assessments/{id}/archive", post(handlers::archive_handler))
        .route("/assessments/{id}/draft", get(handlers::get_draft_handler))
        .route(
            "/assessments/{id}/draft/steps/{step}",
            put(handlers::save_step_handler),
        )
        .route(
            "/assessments/{id}/draft/completion",
            get(handlers::completion_handler),
        )
        .route("/assessments/{id}/draft/summary", get(handlers::summary_handler))
        .route("/assessments/{id}/draft/export", get(handlers::export_handler))
        .route(
            "/assessments/{id}/answers",
            get(handlers::list_answers_handler).post(handlers::record_answer_handler),
        )
        .layer(axum_middleware::from_fn(auth::resolve_actor));

    match config.auth.api_key.as_deref().and_then(ApiKey::new) {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            assessments =
                assessments.layer(axum_middleware::from_fn_with_state(key, auth::require_api_key));
        }
        None => tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set BILAN_API_KEY to enable authentication."
        ),
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .merge(assessments);

    match middleware::rate_limiter(&config.limits) {
        Some(limiter) => {
            tracing::info!(
                "Rate limiting enabled: {} requests/second",
                config.limits.rate_limit
            );
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum::extract::DefaultBodyLimit::max(
                    config.limits.body_limit_bytes,
                )),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(
    service: ProgressionService,
    config: BilanConfig,
) -> Result<(), BilanError> {
    let addr = config.listen_addr();
    let state = AppState::with_config(service, config);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BilanError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Bilan HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| BilanError::IoError(format!("Server error: {}", e)))
}
