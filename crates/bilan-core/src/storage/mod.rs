//! # Storage Module
//!
//! Persistence collaborators of the progression engine.
//!
//! Two traits describe what the engine needs from storage:
//! - [`AssessmentStore`]: assessment rows and their wizard drafts
//! - [`AnswerLedger`]: questionnaire answers
//!
//! Both are implemented by [`MemoryStore`] (volatile) and [`RedbStore`]
//! (disk-backed, ACID). Conditional writes run inside the backend's single
//! writer (the `&mut` borrow for memory, a write transaction for redb), so a
//! comparison against the expected prior state and the write that follows
//! cannot interleave with another writer.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::answers::{AnswerRecord, AnswerSubmission};
use crate::assessment::{Assessment, PhaseCompletion};
use crate::draft::WizardDraft;
use crate::system::{archive, complete_phase};
use crate::{AssessmentId, BilanError, OverallStatus, Phase, Timestamp};

// =============================================================================
// TRAITS
// =============================================================================

/// Outcome of a versioned draft save.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftSave {
    /// The draft was stored; carries the stamped draft.
    Saved(WizardDraft),
    /// The stored draft moved on since the caller read it.
    Conflict { current_version: u64 },
}

/// Storage of assessments and their drafts.
pub trait AssessmentStore {
    /// Get an assessment by id.
    fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>, BilanError>;

    /// Insert a new assessment. Fails with `StateConflict` if the id is taken.
    fn insert_assessment(&mut self, assessment: &Assessment) -> Result<(), BilanError>;

    /// All assessments, ordered by id.
    fn list_assessments(&self) -> Result<Vec<Assessment>, BilanError>;

    /// Get the stored draft. `None` until the first save.
    fn get_draft(&self, id: AssessmentId) -> Result<Option<WizardDraft>, BilanError>;

    /// Store `draft` if the stored version still equals `expected_version`.
    ///
    /// On success the draft is stamped with `expected_version + 1` and `now`.
    fn save_draft(
        &mut self,
        id: AssessmentId,
        draft: &WizardDraft,
        expected_version: u64,
        now: Timestamp,
    ) -> Result<DraftSave, BilanError>;

    /// Complete `phase` if the stored completion state equals `expected_prior`.
    ///
    /// Fails with `StateConflict` when another writer got there first.
    fn update_phase_completion(
        &mut self,
        id: AssessmentId,
        phase: Phase,
        expected_prior: &PhaseCompletion,
        now: Timestamp,
    ) -> Result<Assessment, BilanError>;

    /// Archive the assessment if its stored status equals `expected_prior_status`.
    fn archive_assessment(
        &mut self,
        id: AssessmentId,
        expected_prior_status: OverallStatus,
        now: Timestamp,
    ) -> Result<Assessment, BilanError>;
}

/// Storage of questionnaire answers.
pub trait AnswerLedger {
    /// Answers of an assessment, ordered by `created_at`.
    fn list_answers(&self, id: AssessmentId) -> Result<Vec<AnswerRecord>, BilanError>;

    /// Upsert an answer by `(assessment, question)`.
    ///
    /// Fails with `AssessmentNotFound` for an unknown assessment.
    fn record_answer(
        &mut self,
        submission: AnswerSubmission,
        now: Timestamp,
    ) -> Result<AnswerRecord, BilanError>;
}

/// A complete storage backend.
pub trait Store: AssessmentStore + AnswerLedger + Send + Sync {}

impl<T: AssessmentStore + AnswerLedger + Send + Sync> Store for T {}

// =============================================================================
// CONDITIONAL WRITE RULES (shared by backends)
// =============================================================================

/// Version check for a draft save.
pub(crate) fn stamp_draft(
    draft: &WizardDraft,
    stored_version: u64,
    expected_version: u64,
    now: Timestamp,
) -> DraftSave {
    if stored_version != expected_version {
        return DraftSave::Conflict {
            current_version: stored_version,
        };
    }
    DraftSave::Saved(draft.stamped(stored_version.saturating_add(1), now))
}

/// Compare-and-complete against the stored assessment.
pub(crate) fn conditional_complete(
    stored: &Assessment,
    phase: Phase,
    expected_prior: &PhaseCompletion,
    now: Timestamp,
) -> Result<Assessment, BilanError> {
    if stored.phase_completion != *expected_prior {
        return Err(BilanError::StateConflict(stored.id));
    }
    complete_phase(stored, phase, now)
}

/// Compare-and-archive against the stored assessment.
pub(crate) fn conditional_archive(
    stored: &Assessment,
    expected_prior_status: OverallStatus,
    now: Timestamp,
) -> Result<Assessment, BilanError> {
    if stored.overall_status != expected_prior_status {
        return Err(BilanError::StateConflict(stored.id));
    }
    archive(stored, now)
}

/// Order answers the way the ledger returns them.
pub(crate) fn sort_answers(answers: &mut [AnswerRecord]) {
    answers.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.question_id.cmp(&b.question_id))
    });
}
