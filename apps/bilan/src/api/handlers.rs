//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Handlers read the clock; the engine never does. Mutating handlers, and
//! an export that includes contact details, require an [`Actor`] and check
//! that it is the assessment's owner or assigned consultant.

use super::{
    AppState,
    auth::Actor,
    types::{
        ApiError, AssessmentResponse, CreateAssessmentRequest, DraftResponse, ExportQuery,
        HealthResponse, RecordAnswerRequest, SaveStepRequest, SaveStepResponse,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use bilan_core::{
    AnswerRecord, Assessment, AssessmentId, DraftExport, DraftProgress, DraftSummary,
    ParcoursView, Phase, UserId, compute_step_completion,
};
use chrono::Utc;

// =============================================================================
// HELPERS
// =============================================================================

fn authorize(assessment: &Assessment, actor: UserId) -> Result<(), ApiError> {
    if assessment.is_participant(actor) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(actor))
    }
}

fn assessment_id(raw: &str) -> Result<AssessmentId, ApiError> {
    Ok(AssessmentId::parse(raw)?)
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// ASSESSMENT HANDLERS
// =============================================================================

/// List all assessments.
pub async fn list_assessments_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<AssessmentResponse>>, ApiError> {
    let service = state.service.read().await;
    let assessments = service.list_assessments()?;
    Ok(Json(assessments.into_iter().map(Into::into).collect()))
}

/// Create an assessment. The actor must be the owner or the consultant.
pub async fn create_assessment_handler(
    State(state): State<AppState>,
    actor: Option<Extension<Actor>>,
    Json(request): Json<CreateAssessmentRequest>,
) -> Result<(StatusCode, Json<AssessmentResponse>), ApiError> {
    let actor = Actor::required(actor)?;
    if actor != request.owner_id && request.assigned_consultant_id != Some(actor) {
        return Err(ApiError::Forbidden(actor));
    }

    let mut service = state.service.write().await;
    let assessment = service.create_assessment(
        AssessmentId::new_v4(),
        request.owner_id,
        request.assigned_consultant_id,
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(assessment.into())))
}

/// Get one assessment.
pub async fn get_assessment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let id = assessment_id(&id)?;
    let service = state.service.read().await;
    Ok(Json(service.assessment(id)?.into()))
}

/// Gate state and phase progress.
pub async fn parcours_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ParcoursView>, ApiError> {
    let id = assessment_id(&id)?;
    let service = state.service.read().await;
    Ok(Json(service.parcours(id)?))
}

/// Complete a phase.
pub async fn complete_phase_handler(
    State(state): State<AppState>,
    actor: Option<Extension<Actor>>,
    Path((id, phase)): Path<(String, String)>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let actor = Actor::required(actor)?;
    let id = assessment_id(&id)?;
    let phase = Phase::parse(&phase)?;

    let mut service = state.service.write().await;
    authorize(&service.assessment(id)?, actor)?;
    let updated = service.complete_phase(id, phase, Utc::now())?;
    Ok(Json(updated.into()))
}

/// Archive a completed assessment.
pub async fn archive_handler(
    State(state): State<AppState>,
    actor: Option<Extension<Actor>>,
    Path(id): Path<String>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let actor = Actor::required(actor)?;
    let id = assessment_id(&id)?;

    let mut service = state.service.write().await;
    authorize(&service.assessment(id)?, actor)?;
    let archived = service.archive(id, Utc::now())?;
    Ok(Json(archived.into()))
}

// =============================================================================
// DRAFT HANDLERS
// =============================================================================

/// Get the draft.
pub async fn get_draft_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftResponse>, ApiError> {
    let id = assessment_id(&id)?;
    let service = state.service.read().await;
    let draft = service.draft(id)?;
    Ok(Json(DraftResponse::from_draft(id, &draft)?))
}

/// Merge a partial payload into one step.
pub async fn save_step_handler(
    State(state): State<AppState>,
    actor: Option<Extension<Actor>>,
    Path((id, step)): Path<(String, i64)>,
    Json(request): Json<SaveStepRequest>,
) -> Result<Json<SaveStepResponse>, ApiError> {
    let actor = Actor::required(actor)?;
    let id = assessment_id(&id)?;

    let mut service = state.service.write().await;
    authorize(&service.assessment(id)?, actor)?;
    let saved = service.save_step(id, step, &request.data, request.version, Utc::now())?;

    Ok(Json(SaveStepResponse {
        success: true,
        version: saved.version(),
        updated_at: saved.updated_at(),
        completion: compute_step_completion(&saved),
    }))
}

/// Step completion and navigation state.
pub async fn completion_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftProgress>, ApiError> {
    let id = assessment_id(&id)?;
    let service = state.service.read().await;
    Ok(Json(service.draft_progress(id)?))
}

/// Draft analytics summary.
pub async fn summary_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftSummary>, ApiError> {
    let id = assessment_id(&id)?;
    let service = state.service.read().await;
    Ok(Json(service.summary(id)?))
}

/// Export bundle, redacted unless `include_personal_info=true`.
///
/// Contact details are only released to a participant of the assessment.
pub async fn export_handler(
    State(state): State<AppState>,
    actor: Option<Extension<Actor>>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<DraftExport>, ApiError> {
    let id = assessment_id(&id)?;
    let service = state.service.read().await;
    if query.include_personal_info {
        let actor = Actor::required(actor)?;
        authorize(&service.assessment(id)?, actor)?;
    }
    Ok(Json(service.export(
        id,
        query.include_personal_info,
        Utc::now(),
    )?))
}

// =============================================================================
// ANSWER HANDLERS
// =============================================================================

/// List answers.
pub async fn list_answers_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AnswerRecord>>, ApiError> {
    let id = assessment_id(&id)?;
    let service = state.service.read().await;
    Ok(Json(service.answers(id)?))
}

/// Record (upsert) an answer.
pub async fn record_answer_handler(
    State(state): State<AppState>,
    actor: Option<Extension<Actor>>,
    Path(id): Path<String>,
    Json(request): Json<RecordAnswerRequest>,
) -> Result<Json<AnswerRecord>, ApiError> {
    let actor = Actor::required(actor)?;
    let id = assessment_id(&id)?;

    let mut service = state.service.write().await;
    authorize(&service.assessment(id)?, actor)?;
    let record = service.record_answer(
        id,
        &request.question_id,
        request.step_number,
        &request.answer_text,
        Utc::now(),
    )?;
    Ok(Json(record))
}
