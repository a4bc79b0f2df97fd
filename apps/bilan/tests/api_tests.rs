//! Integration tests for the Bilan HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderName, HeaderValue, header};
use axum_test::TestServer;
use bilan::api::{
    ACTOR_HEADER, AppState, AssessmentResponse, DraftResponse, ErrorResponse, HealthResponse,
    SaveStepResponse, create_router,
};
use bilan::config::BilanConfig;
use bilan_core::{
    AnswerRecord, OverallStatus, ParcoursView, Phase, PhaseState, ProgressionService, UserId,
};
use serde_json::{Value, json};
use uuid::Uuid;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn server_with_config(config: BilanConfig) -> TestServer {
    let state = AppState::with_config(ProgressionService::new(), config);
    TestServer::new(create_router(state)).unwrap()
}

/// Create a test server with a fresh in-memory service and no API key.
fn create_test_server() -> TestServer {
    server_with_config(BilanConfig::default())
}

fn owner() -> UserId {
    UserId(Uuid::from_u128(0x0a))
}

fn consultant() -> UserId {
    UserId(Uuid::from_u128(0x0c))
}

fn actor_name() -> HeaderName {
    HeaderName::from_static(ACTOR_HEADER)
}

fn actor_value(user: UserId) -> HeaderValue {
    user.to_string().parse::<HeaderValue>().unwrap()
}

/// Create an assessment owned by `owner()` with `consultant()` assigned.
async fn create_assessment(server: &TestServer) -> AssessmentResponse {
    let response = server
        .post("/assessments")
        .add_header(actor_name(), actor_value(owner()))
        .json(&json!({
            "owner_id": owner(),
            "assigned_consultant_id": consultant(),
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 201);
    response.json()
}

async fn save_step(
    server: &TestServer,
    id: &str,
    step: u8,
    data: Value,
    version: Option<u64>,
) -> axum_test::TestResponse {
    server
        .put(&format!("/assessments/{}/draft/steps/{}", id, step))
        .add_header(actor_name(), actor_value(owner()))
        .json(&json!({ "data": data, "version": version }))
        .await
}

async fn complete(server: &TestServer, id: &str, phase: &str) -> axum_test::TestResponse {
    server
        .post(&format!("/assessments/{}/phases/{}/complete", id, phase))
        .add_header(actor_name(), actor_value(consultant()))
        .await
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// ASSESSMENT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_create_and_get_assessment() {
    let server = create_test_server();

    let created = create_assessment(&server).await;
    assert_eq!(created.overall_status, OverallStatus::Preliminary);
    assert_eq!(created.owner_id, owner());
    assert!(!created.phase_completion.preliminary.completed);

    let response = server.get(&format!("/assessments/{}", created.id)).await;
    response.assert_status_ok();
    let fetched: AssessmentResponse = response.json();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.assigned_consultant_id, Some(consultant()));

    let list: Vec<AssessmentResponse> = server.get("/assessments").await.json();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn test_create_requires_actor_header() {
    let server = create_test_server();

    let response = server
        .post("/assessments")
        .json(&json!({ "owner_id": owner() }))
        .await;

    assert_eq!(response.status_code().as_u16(), 401);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "missing_actor");
}

#[tokio::test]
async fn test_create_rejects_malformed_actor() {
    let server = create_test_server();

    let response = server
        .post("/assessments")
        .add_header(actor_name(), HeaderValue::from_static("not-a-uuid"))
        .json(&json!({ "owner_id": owner() }))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
}

#[tokio::test]
async fn test_create_for_someone_else_is_forbidden() {
    let server = create_test_server();

    let stranger = UserId(Uuid::from_u128(0xff));
    let response = server
        .post("/assessments")
        .add_header(actor_name(), actor_value(stranger))
        .json(&json!({ "owner_id": owner() }))
        .await;

    assert_eq!(response.status_code().as_u16(), 403);
}

#[tokio::test]
async fn test_unknown_assessment_is_not_found() {
    let server = create_test_server();

    let response = server
        .get(&format!("/assessments/{}", Uuid::from_u128(42)))
        .await;

    assert_eq!(response.status_code().as_u16(), 404);
    let error: ErrorResponse = response.json();
    assert!(!error.success);
    assert_eq!(error.code, "not_found");
}

#[tokio::test]
async fn test_malformed_assessment_id_is_bad_request() {
    let server = create_test_server();

    let response = server.get("/assessments/not-a-uuid/parcours").await;

    assert_eq!(response.status_code().as_u16(), 400);
}

// =============================================================================
// DRAFT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_empty_draft_is_version_zero() {
    let server = create_test_server();
    let created = create_assessment(&server).await;

    let response = server
        .get(&format!("/assessments/{}/draft", created.id))
        .await;

    response.assert_status_ok();
    let draft: DraftResponse = response.json();
    assert_eq!(draft.version, 0);
    assert!(draft.updated_at.is_none());
    assert!(draft.steps.is_empty());
}

#[tokio::test]
async fn test_save_step_merges_and_reports_completion() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    let response = save_step(&server, &id, 2, json!({"skills": ["SQL"]}), None).await;
    response.assert_status_ok();
    let saved: SaveStepResponse = response.json();
    assert!(saved.success);
    assert_eq!(saved.version, 1);
    assert_eq!(saved.completion.completed_steps, 1);
    assert_eq!(saved.completion.percentage, 20);

    let response = save_step(&server, &id, 2, json!({"experiences": ["Analyst"]}), None).await;
    let saved: SaveStepResponse = response.json();
    assert_eq!(saved.version, 2);

    let draft: DraftResponse = server
        .get(&format!("/assessments/{}/draft", id))
        .await
        .json();
    assert_eq!(draft.steps["step2"]["skills"], json!(["SQL"]));
    assert_eq!(draft.steps["step2"]["experiences"], json!(["Analyst"]));
}

#[tokio::test]
async fn test_stale_version_conflicts() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    save_step(&server, &id, 1, json!({"career_goals": "data"}), Some(0))
        .await
        .assert_status_ok();

    let response = save_step(&server, &id, 1, json!({"career_goals": "ops"}), Some(0)).await;

    assert_eq!(response.status_code().as_u16(), 409);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "version_conflict");
}

#[tokio::test]
async fn test_invalid_step_index_is_bad_request() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    let response = save_step(&server, &id, 6, json!({"x": 1}), None).await;

    assert_eq!(response.status_code().as_u16(), 400);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "invalid_step_index");
}

#[tokio::test]
async fn test_non_mapping_payload_is_bad_request() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    let response = save_step(&server, &id, 3, json!(["not", "a", "map"]), None).await;

    assert_eq!(response.status_code().as_u16(), 400);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "invalid_payload_shape");
}

#[tokio::test]
async fn test_save_step_by_stranger_is_forbidden() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id;

    let response = server
        .put(&format!("/assessments/{}/draft/steps/1", id))
        .add_header(actor_name(), actor_value(UserId(Uuid::from_u128(0xee))))
        .json(&json!({ "data": {"career_goals": "x"} }))
        .await;

    assert_eq!(response.status_code().as_u16(), 403);
}

#[tokio::test]
async fn test_completion_and_summary() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    save_step(&server, &id, 2, json!({"skills": ["SQL", "Python"]}), None).await;
    save_step(
        &server,
        &id,
        3,
        json!({"competencies": [{"skill_name": "SQL", "self_assessment_level": 4}]}),
        None,
    )
    .await;

    let completion: Value = server
        .get(&format!("/assessments/{}/draft/completion", id))
        .await
        .json();
    assert_eq!(completion["completion"]["completed_steps"], 2);
    assert_eq!(completion["completion"]["percentage"], 40);
    assert_eq!(completion["current_step"], 1);

    let summary: Value = server
        .get(&format!("/assessments/{}/draft/summary", id))
        .await
        .json();
    assert_eq!(summary["items"]["skills"], 2);
    assert_eq!(summary["items"]["competencies"], 1);
    assert_eq!(summary["has_personal_info"], false);
}

#[tokio::test]
async fn test_export_redacts_contact_details_by_default() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    save_step(
        &server,
        &id,
        1,
        json!({"personal_info": {
            "name": "Ana",
            "email": "ana@example.fr",
            "phone": "0600000000"
        }}),
        None,
    )
    .await
    .assert_status_ok();

    let redacted: Value = server
        .get(&format!("/assessments/{}/draft/export", id))
        .await
        .json();
    let info = &redacted["draft"]["steps"]["step1"]["personal_info"];
    assert_eq!(redacted["personal_info_included"], false);
    assert_eq!(info["name"], "Ana");
    assert_eq!(info["email"], "[REDACTED]");
    assert_eq!(info["phone"], "[REDACTED]");

    let full: Value = server
        .get(&format!(
            "/assessments/{}/draft/export?include_personal_info=true",
            id
        ))
        .add_header(actor_name(), actor_value(owner()))
        .await
        .json();
    assert_eq!(
        full["draft"]["steps"]["step1"]["personal_info"]["email"],
        "ana@example.fr"
    );
}

#[tokio::test]
async fn test_export_with_contact_details_requires_participant() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();
    save_step(
        &server,
        &id,
        1,
        json!({"personal_info": {"email": "ana@example.fr"}}),
        None,
    )
    .await
    .assert_status_ok();
    let url = format!("/assessments/{}/draft/export?include_personal_info=true", id);

    let anonymous = server.get(&url).await;
    assert_eq!(anonymous.status_code().as_u16(), 401);
    let error: ErrorResponse = anonymous.json();
    assert_eq!(error.code, "missing_actor");

    let stranger = server
        .get(&url)
        .add_header(actor_name(), actor_value(UserId(Uuid::from_u128(0xff))))
        .await;
    assert_eq!(stranger.status_code().as_u16(), 403);
    assert!(!stranger.text().contains("ana@example.fr"));

    let consultant_view: Value = server
        .get(&url)
        .add_header(actor_name(), actor_value(consultant()))
        .await
        .json();
    assert_eq!(consultant_view["personal_info_included"], true);
    assert_eq!(
        consultant_view["draft"]["steps"]["step1"]["personal_info"]["email"],
        "ana@example.fr"
    );
}

// =============================================================================
// PHASE GATE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_phases_complete_in_order() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    let response = complete(&server, &id, "investigation").await;
    assert_eq!(response.status_code().as_u16(), 409);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "phase_out_of_order");

    let response = complete(&server, &id, "preliminary").await;
    response.assert_status_ok();
    let updated: AssessmentResponse = response.json();
    assert_eq!(updated.overall_status, OverallStatus::Investigation);
    assert!(updated.phase_completion.preliminary.completed_at.is_some());

    let response = complete(&server, &id, "preliminary").await;
    assert_eq!(response.status_code().as_u16(), 409);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "phase_already_completed");
}

#[tokio::test]
async fn test_unknown_phase_is_bad_request() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    let response = complete(&server, &id, "debrief").await;

    assert_eq!(response.status_code().as_u16(), 400);
}

#[tokio::test]
async fn test_full_lifecycle_then_archive() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    let archive = |server: &TestServer| {
        server
            .post(&format!("/assessments/{}/archive", id))
            .add_header(actor_name(), actor_value(owner()))
    };

    assert_eq!(archive(&server).await.status_code().as_u16(), 409);

    for phase in ["preliminary", "investigation", "conclusion"] {
        complete(&server, &id, phase).await.assert_status_ok();
    }

    let response = archive(&server).await;
    response.assert_status_ok();
    let archived: AssessmentResponse = response.json();
    assert_eq!(archived.overall_status, OverallStatus::Archived);
    assert!(archived.completed_at.is_some());
    assert!(archived.archived_at.is_some());
}

// =============================================================================
// ANSWER AND PARCOURS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_answers_feed_parcours_progress() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    for (question, step) in [("q1", 1), ("q2", 2)] {
        server
            .post(&format!("/assessments/{}/answers", id))
            .add_header(actor_name(), actor_value(owner()))
            .json(&json!({
                "question_id": question,
                "step_number": step,
                "answer_text": "answer",
            }))
            .await
            .assert_status_ok();
    }

    let answers: Vec<AnswerRecord> = server
        .get(&format!("/assessments/{}/answers", id))
        .await
        .json();
    assert_eq!(answers.len(), 2);

    let view: ParcoursView = server
        .get(&format!("/assessments/{}/parcours", id))
        .await
        .json();
    assert_eq!(view.current_phase, Some(Phase::Preliminary));
    assert_eq!(view.phases[0].state, PhaseState::InProgress);
    assert_eq!(view.phases[0].progress, 33);
    assert_eq!(view.phases[1].state, PhaseState::Locked);
}

#[tokio::test]
async fn test_invalid_answer_is_bad_request() {
    let server = create_test_server();
    let id = create_assessment(&server).await.id.to_string();

    let response = server
        .post(&format!("/assessments/{}/answers", id))
        .add_header(actor_name(), actor_value(owner()))
        .json(&json!({
            "question_id": "   ",
            "step_number": 1,
            "answer_text": "answer",
        }))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "invalid_answer");
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

/// Create a test server with authentication enabled.
fn create_auth_test_server(api_key: &str) -> TestServer {
    let mut config = BilanConfig::default();
    config.auth.api_key = Some(api_key.to_string());
    server_with_config(config)
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/assessments")
        .add_header(
            header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/assessments")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer wrong-key"),
        )
        .await;

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Invalid token should return 401 Unauthorized"
    );
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = create_auth_test_server("required-key");

    let response = server.get("/assessments").await;

    assert_eq!(response.status_code().as_u16(), 401);
}

#[tokio::test]
async fn test_auth_runs_before_actor_check() {
    let server = create_auth_test_server("actor-order-key");

    let response = server
        .get("/assessments")
        .add_header(actor_name(), HeaderValue::from_static("not-a-user"))
        .await;

    assert_eq!(response.status_code().as_u16(), 401);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "unauthorized");
}

#[tokio::test]
async fn test_malformed_actor_header_rejected() {
    let server = create_test_server();

    let response = server
        .get("/assessments")
        .add_header(actor_name(), HeaderValue::from_static("not-a-user"))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "invalid_actor");
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let server = create_auth_test_server("secret-key-for-bypass-test");

    let response = server.get("/health").await;

    response.assert_status_ok();
}

// =============================================================================
// RATE LIMIT TESTS
// =============================================================================

#[tokio::test]
async fn test_rate_limit_returns_too_many_requests() {
    let mut config = BilanConfig::default();
    config.limits.rate_limit = 1;
    let server = server_with_config(config);

    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;

    assert_eq!(response.status_code().as_u16(), 429);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "rate_limited");
}
