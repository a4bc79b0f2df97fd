//! # bilan-core
//!
//! The Assessment Progression Engine for Bilan - THE LOGIC.
//!
//! This crate tracks a multi-step competency assessment ("bilan"): it merges
//! partial wizard submissions into a draft, derives completion statistics,
//! and enforces the ordered, one-way, three-phase gate
//! (PRELIMINARY → INVESTIGATION → CONCLUSION → COMPLETED).
//!
//! ## Layout
//!
//! - `draft`, `completion`, `summary`, `system`: pure engine functions
//! - `assessment`, `answers`: the records they operate on
//! - `formats`, `storage`: record encoding and storage backends
//! - `service`: the facade tying storage and engine together
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - No clock reads: every timestamp is passed in by the caller
//! - Integer arithmetic only for percentages (round half up)

// =============================================================================
// MODULES
// =============================================================================

pub mod answers;
pub mod assessment;
pub mod completion;
pub mod draft;
pub mod formats;
pub mod primitives;
pub mod service;
pub mod storage;
pub mod summary;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AssessmentId, BilanError, ErrorKind, OverallStatus, Phase, QuestionId, Timestamp, UserId,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use answers::{AnswerRecord, AnswerSubmission};
pub use assessment::{Assessment, PhaseCompletion, PhaseCompletionRecord};
pub use completion::{
    StepCompletion, StepStatus, compute_step_completion, current_step, is_draft_complete,
    step_status, step_statuses,
};
pub use draft::{StepDocument, StepIndex, WizardDraft, merge_step};
pub use service::{DraftProgress, ProgressionService, StorageBackend};
pub use storage::{AnswerLedger, AssessmentStore, DraftSave, MemoryStore, RedbStore, Store};
pub use summary::{
    CompetencyRecord, DraftExport, DraftSummary, ItemCounts, export_draft, extract_competencies,
    redact, summarize,
};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::{
    ParcoursView, PhaseState, PhaseView, archive, complete_phase, compute_phase_progress,
    current_phase, is_phase_accessible, parcours,
};
