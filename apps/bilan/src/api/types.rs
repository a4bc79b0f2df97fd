//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API, and the error
//! type handlers return.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bilan_core::{
    Assessment, AssessmentId, BilanError, ErrorKind, OverallStatus, PhaseCompletion, StepCompletion,
    Timestamp, UserId, WizardDraft,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ASSESSMENTS
// =============================================================================

/// Create assessment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssessmentRequest {
    pub owner_id: UserId,
    #[serde(default)]
    pub assigned_consultant_id: Option<UserId>,
}

/// Assessment as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub id: AssessmentId,
    pub owner_id: UserId,
    pub assigned_consultant_id: Option<UserId>,
    pub overall_status: OverallStatus,
    pub phase_completion: PhaseCompletion,
    pub completed_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Assessment> for AssessmentResponse {
    fn from(a: Assessment) -> Self {
        Self {
            id: a.id,
            owner_id: a.owner_id,
            assigned_consultant_id: a.assigned_consultant_id,
            overall_status: a.overall_status,
            phase_completion: a.phase_completion,
            completed_at: a.completed_at,
            archived_at: a.archived_at,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

// =============================================================================
// DRAFT
// =============================================================================

/// Save step request: a partial payload for one wizard step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveStepRequest {
    pub data: Value,
    /// Draft version the client last saw; omit for last-write-wins.
    #[serde(default)]
    pub version: Option<u64>,
}

/// Save step response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveStepResponse {
    pub success: bool,
    pub version: u64,
    pub updated_at: Option<Timestamp>,
    pub completion: StepCompletion,
}

/// Draft as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftResponse {
    pub assessment_id: AssessmentId,
    pub version: u64,
    pub updated_at: Option<Timestamp>,
    pub steps: Map<String, Value>,
}

impl DraftResponse {
    /// Build the response from a draft.
    pub fn from_draft(assessment_id: AssessmentId, draft: &WizardDraft) -> Result<Self, ApiError> {
        let mut steps = Map::new();
        for (step, document) in draft.steps() {
            steps.insert(step.key().to_string(), Value::Object(document.to_fields()?));
        }
        Ok(Self {
            assessment_id,
            version: draft.version(),
            updated_at: draft.updated_at(),
            steps,
        })
    }
}

/// Export query parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub include_personal_info: bool,
}

// =============================================================================
// ANSWERS
// =============================================================================

/// Record answer request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordAnswerRequest {
    pub question_id: String,
    pub step_number: i64,
    pub answer_text: String,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
            error: error.into(),
        }
    }
}

/// Handler error.
#[derive(Debug)]
pub enum ApiError {
    /// An engine error, mapped by its kind.
    Engine(BilanError),
    /// The API key is missing or wrong.
    Unauthenticated,
    /// The global request rate was exceeded.
    RateLimited,
    /// The actor header is absent on a request that needs one.
    MissingActor,
    /// The actor header is not a user id.
    InvalidActor(String),
    /// The actor is neither owner nor assigned consultant.
    Forbidden(UserId),
}

impl From<BilanError> for ApiError {
    fn from(e: BilanError) -> Self {
        Self::Engine(e)
    }
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthenticated | Self::MissingActor => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidActor(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::Engine(e) if e.kind() == ErrorKind::Internal => {
                ErrorResponse::new(e.code(), "Internal server error")
            }
            Self::Engine(e) => ErrorResponse::new(e.code(), e.to_string()),
            Self::Unauthenticated => ErrorResponse::new("unauthorized", "Unauthorized"),
            Self::RateLimited => ErrorResponse::new("rate_limited", "Too Many Requests"),
            Self::MissingActor => ErrorResponse::new("missing_actor", "Missing actor header"),
            Self::InvalidActor(value) => {
                ErrorResponse::new("invalid_actor", format!("Invalid actor: {value}"))
            }
            Self::Forbidden(_) => ErrorResponse::new(
                "forbidden",
                "Only the owner or the assigned consultant may access this",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Engine(e) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %e, "request failed");
            }
            Self::Forbidden(actor) => {
                tracing::warn!(event = "authz_failure", actor = %actor, "actor not allowed");
            }
            _ => {}
        }
        (status, Json(self.body())).into_response()
    }
}
