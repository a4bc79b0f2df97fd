//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command opens the configured backend, runs one service operation
//! and prints either a human-readable report or, with `--json-mode`, the
//! JSON form of the result.

use crate::api;
use crate::config::{BackendKind, BilanConfig};
use bilan_core::{
    Assessment, AssessmentId, BilanError, Phase, PhaseState, ProgressionService, StepStatus,
    UserId,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a step payload file (1 MB).
const MAX_PAYLOAD_FILE_SIZE: u64 = 1024 * 1024;

/// Read a JSON payload file after checking it is a regular file of bounded size.
fn read_payload_file(path: &Path) -> Result<String, BilanError> {
    // Canonicalize resolves "..", symlinks, and validates existence
    let canonical = path.canonicalize().map_err(|e| {
        BilanError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| BilanError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if !metadata.is_file() {
        return Err(BilanError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_PAYLOAD_FILE_SIZE {
        return Err(BilanError::InvalidPayloadShape(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_PAYLOAD_FILE_SIZE
        )));
    }

    std::fs::read_to_string(&canonical)
        .map_err(|e| BilanError::IoError(format!("Read file: {}", e)))
}

/// Print a value as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> Result<(), BilanError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| BilanError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn print_assessment(assessment: &Assessment) {
    println!("Assessment {}", assessment.id);
    println!("  Owner:      {}", assessment.owner_id);
    match assessment.assigned_consultant_id {
        Some(consultant) => println!("  Consultant: {}", consultant),
        None => println!("  Consultant: (none)"),
    }
    println!("  Status:     {}", assessment.overall_status);
    for phase in Phase::ALL {
        let record = assessment.phase_completion.get(phase);
        match record.completed_at {
            Some(at) => println!("  {:<14} completed {}", phase, at.to_rfc3339()),
            None => println!("  {:<14} open", phase),
        }
    }
    if let Some(at) = assessment.completed_at {
        println!("  Completed:  {}", at.to_rfc3339());
    }
    if let Some(at) = assessment.archived_at {
        println!("  Archived:   {}", at.to_rfc3339());
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: BilanConfig) -> Result<(), BilanError> {
    let service = load_service(&config)?;

    println!("Bilan Assessment Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.listen_addr());
    println!("  Backend:  {:?}", config.storage.backend);
    println!("  Database: {:?}", config.storage.database);
    println!();
    println!("Endpoints:");
    println!("  GET|POST /assessments");
    println!("  GET      /assessments/{{id}}/parcours");
    println!("  POST     /assessments/{{id}}/phases/{{phase}}/complete");
    println!("  PUT      /assessments/{{id}}/draft/steps/{{step}}");
    println!("  GET      /assessments/{{id}}/draft/completion");
    println!("  GET|POST /assessments/{{id}}/answers");
    println!("  GET      /health");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(service, config).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(config: &BilanConfig, force: bool) -> Result<(), BilanError> {
    let path = &config.storage.database;
    match config.storage.backend {
        BackendKind::Memory => {
            println!("Memory backend selected; nothing to initialize");
            Ok(())
        }
        BackendKind::Redb => {
            if path.exists() {
                if !force {
                    return Err(BilanError::IoError(
                        "Database already exists. Use --force to overwrite.".to_string(),
                    ));
                }
                std::fs::remove_file(path)
                    .map_err(|e| BilanError::IoError(format!("Remove db: {}", e)))?;
            }
            let _service = ProgressionService::with_redb(path)?;
            println!("Initialized new redb database at {:?}", path);
            Ok(())
        }
    }
}

// =============================================================================
// ASSESSMENT COMMANDS
// =============================================================================

/// Create an assessment.
pub fn cmd_create(
    config: &BilanConfig,
    json_mode: bool,
    owner: &str,
    consultant: Option<&str>,
) -> Result<(), BilanError> {
    let owner = UserId::parse(owner)?;
    let consultant = consultant.map(UserId::parse).transpose()?;

    let mut service = load_service(config)?;
    let assessment =
        service.create_assessment(AssessmentId::new_v4(), owner, consultant, Utc::now())?;

    if json_mode {
        return print_json(&assessment);
    }
    print_assessment(&assessment);
    Ok(())
}

/// List assessments.
pub fn cmd_list(config: &BilanConfig, json_mode: bool) -> Result<(), BilanError> {
    let service = load_service(config)?;
    let assessments = service.list_assessments()?;

    if json_mode {
        return print_json(&assessments);
    }

    println!("Assessments ({})", assessments.len());
    println!("==============");
    for assessment in &assessments {
        println!(
            "{}  {:<13}  owner {}",
            assessment.id, assessment.overall_status, assessment.owner_id
        );
    }
    Ok(())
}

/// Show one assessment.
pub fn cmd_show(config: &BilanConfig, json_mode: bool, id: &str) -> Result<(), BilanError> {
    let id = AssessmentId::parse(id)?;
    let assessment = load_service(config)?.assessment(id)?;

    if json_mode {
        return print_json(&assessment);
    }
    print_assessment(&assessment);
    Ok(())
}

/// Show gate state and phase progress.
pub fn cmd_parcours(config: &BilanConfig, json_mode: bool, id: &str) -> Result<(), BilanError> {
    let id = AssessmentId::parse(id)?;
    let view = load_service(config)?.parcours(id)?;

    if json_mode {
        return print_json(&view);
    }

    println!("Parcours {}", id);
    println!("==================");
    println!("Status:  {}", view.overall_status);
    match view.current_phase {
        Some(phase) => println!("Current: {}", phase),
        None => println!("Current: (all phases completed)"),
    }
    println!("Overall: {}%", view.overall_progress);
    println!();
    for phase in &view.phases {
        let state = match phase.state {
            PhaseState::Locked => "locked",
            PhaseState::InProgress => "in progress",
            PhaseState::Completed => "completed",
        };
        println!("  {:<14} {:<12} {:>3}%", phase.phase, state, phase.progress);
    }
    Ok(())
}

/// Complete a phase.
pub fn cmd_complete_phase(
    config: &BilanConfig,
    json_mode: bool,
    id: &str,
    phase: &str,
) -> Result<(), BilanError> {
    let id = AssessmentId::parse(id)?;
    let phase = Phase::parse(phase)?;

    let mut service = load_service(config)?;
    let updated = service.complete_phase(id, phase, Utc::now())?;

    if json_mode {
        return print_json(&updated);
    }
    println!("Phase {} completed", phase);
    print_assessment(&updated);
    Ok(())
}

/// Archive a completed assessment.
pub fn cmd_archive(config: &BilanConfig, json_mode: bool, id: &str) -> Result<(), BilanError> {
    let id = AssessmentId::parse(id)?;

    let mut service = load_service(config)?;
    let archived = service.archive(id, Utc::now())?;

    if json_mode {
        return print_json(&archived);
    }
    print_assessment(&archived);
    Ok(())
}

// =============================================================================
// DRAFT COMMANDS
// =============================================================================

/// Merge a partial payload into a wizard step.
pub fn cmd_save_step(
    config: &BilanConfig,
    json_mode: bool,
    id: &str,
    step: i64,
    data: Option<&str>,
    file: Option<&Path>,
    version: Option<u64>,
) -> Result<(), BilanError> {
    let id = AssessmentId::parse(id)?;
    let text = match (data, file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => read_payload_file(path)?,
        (None, None) => {
            return Err(BilanError::InvalidPayloadShape(
                "provide --data or --file".to_string(),
            ));
        }
    };
    let payload: Value = serde_json::from_str(&text)
        .map_err(|e| BilanError::InvalidPayloadShape(format!("Invalid JSON: {}", e)))?;

    let mut service = load_service(config)?;
    let saved = service.save_step(id, step, &payload, version, Utc::now())?;
    let progress = service.draft_progress(id)?;

    if json_mode {
        let output = serde_json::json!({
            "success": true,
            "version": saved.version(),
            "updated_at": saved.updated_at(),
            "completion": progress.completion,
        });
        return print_json(&output);
    }

    println!("Step {} saved (draft version {})", step, saved.version());
    println!(
        "Completion: {}/{} steps ({}%)",
        progress.completion.completed_steps,
        progress.completion.total_steps,
        progress.completion.percentage
    );
    Ok(())
}

/// Show step completion and navigation state.
pub fn cmd_completion(config: &BilanConfig, json_mode: bool, id: &str) -> Result<(), BilanError> {
    let id = AssessmentId::parse(id)?;
    let progress = load_service(config)?.draft_progress(id)?;

    if json_mode {
        return print_json(&progress);
    }

    println!("Draft Completion");
    println!("================");
    println!(
        "{}/{} steps ({}%)",
        progress.completion.completed_steps,
        progress.completion.total_steps,
        progress.completion.percentage
    );
    for (step, status) in &progress.steps {
        let marker = match status {
            StepStatus::Completed => "x",
            StepStatus::Current => ">",
            StepStatus::Pending => " ",
        };
        println!("  [{}] {} {}", marker, step, step.kind().name());
    }
    Ok(())
}

/// Show the draft summary.
pub fn cmd_summary(config: &BilanConfig, json_mode: bool, id: &str) -> Result<(), BilanError> {
    let id = AssessmentId::parse(id)?;
    let summary = load_service(config)?.summary(id)?;

    if json_mode {
        return print_json(&summary);
    }

    println!("Draft Summary");
    println!("=============");
    println!("Completion:    {}%", summary.completion.percentage);
    println!("Skills:        {}", summary.items.skills);
    println!("Experiences:   {}", summary.items.experiences);
    println!("Competencies:  {}", summary.items.competencies);
    println!("Total items:   {}", summary.items.total_items);
    println!("Personal info: {}", summary.has_personal_info);
    println!("Career goals:  {}", summary.has_career_goals);
    println!("Personality:   {}", summary.has_personality);
    println!("Action plan:   {}", summary.has_action_plan);
    Ok(())
}

/// Export the draft bundle.
pub fn cmd_export(
    config: &BilanConfig,
    id: &str,
    include_personal_info: bool,
    output: Option<&Path>,
) -> Result<(), BilanError> {
    let id = AssessmentId::parse(id)?;
    let bundle = load_service(config)?.export(id, include_personal_info, Utc::now())?;

    match output {
        Some(path) => {
            let text = serde_json::to_string_pretty(&bundle)
                .map_err(|e| BilanError::SerializationError(e.to_string()))?;
            std::fs::write(path, text)
                .map_err(|e| BilanError::IoError(format!("Write export: {}", e)))?;
            println!("Exported draft of {} to {:?}", id, path);
            Ok(())
        }
        None => print_json(&bundle),
    }
}

// =============================================================================
// ANSWER COMMAND
// =============================================================================

/// Record an answer.
pub fn cmd_answer(
    config: &BilanConfig,
    json_mode: bool,
    id: &str,
    question: &str,
    step: i64,
    text: &str,
) -> Result<(), BilanError> {
    let id = AssessmentId::parse(id)?;

    let mut service = load_service(config)?;
    let record = service.record_answer(id, question, step, text, Utc::now())?;

    if json_mode {
        return print_json(&record);
    }
    println!(
        "Answer to {} recorded (step {})",
        record.question_id.as_str(),
        record.step_number
    );
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the progression service on the configured backend.
pub fn load_service(config: &BilanConfig) -> Result<ProgressionService, BilanError> {
    match config.storage.backend {
        BackendKind::Memory => Ok(ProgressionService::new()),
        BackendKind::Redb => ProgressionService::with_redb(&config.storage.database),
    }
}
