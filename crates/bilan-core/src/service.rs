//! # Progression Service
//!
//! The facade callers use: it loads state from a storage backend, runs the
//! pure engine functions and writes results back through the backend's
//! conditional updates.
//!
//! ## Storage Backends
//!
//! - `InMemory`: [`MemoryStore`] (fast, volatile)
//! - `Persistent`: [`RedbStore`] (disk-backed, ACID)
//!
//! The service never reads the clock; every mutating call takes `now`.

use crate::answers::{AnswerRecord, AnswerSubmission};
use crate::assessment::Assessment;
use crate::completion::{
    StepCompletion, StepStatus, compute_step_completion, current_step, step_statuses,
};
use crate::draft::{StepIndex, WizardDraft, merge_step};
use crate::storage::{DraftSave, MemoryStore, RedbStore, Store};
use crate::summary::{DraftExport, DraftSummary, export_draft, summarize};
use crate::system::{ParcoursView, check_completion, parcours};
use crate::{AssessmentId, BilanError, OverallStatus, Phase, Timestamp, UserId};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Storage backend of a service.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// Wizard completion as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DraftProgress {
    pub completion: StepCompletion,
    pub current_step: u8,
    pub steps: Vec<(StepIndex, StepStatus)>,
}

/// The progression engine bound to a storage backend.
#[derive(Debug, Default)]
pub struct ProgressionService {
    backend: StorageBackend,
}

impl ProgressionService {
    /// Create a service with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service with persistent redb storage at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, BilanError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// Create a service over an existing backend.
    #[must_use]
    pub fn with_backend(backend: StorageBackend) -> Self {
        Self { backend }
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    fn store(&self) -> &dyn Store {
        match &self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    fn store_mut(&mut self) -> &mut dyn Store {
        match &mut self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    // =========================================================================
    // ASSESSMENTS
    // =========================================================================

    /// Create a fresh assessment in PRELIMINARY with an empty draft.
    pub fn create_assessment(
        &mut self,
        id: AssessmentId,
        owner_id: UserId,
        assigned_consultant_id: Option<UserId>,
        now: Timestamp,
    ) -> Result<Assessment, BilanError> {
        let assessment = Assessment::new(id, owner_id, assigned_consultant_id, now);
        self.store_mut().insert_assessment(&assessment)?;
        info!(assessment = %id, owner = %owner_id, "assessment created");
        Ok(assessment)
    }

    /// Get an assessment, failing when it does not exist.
    pub fn assessment(&self, id: AssessmentId) -> Result<Assessment, BilanError> {
        self.store()
            .get_assessment(id)?
            .ok_or(BilanError::AssessmentNotFound(id))
    }

    /// All assessments, ordered by id.
    pub fn list_assessments(&self) -> Result<Vec<Assessment>, BilanError> {
        self.store().list_assessments()
    }

    // =========================================================================
    // DRAFT
    // =========================================================================

    /// The current draft; an empty version-0 draft until the first save.
    pub fn draft(&self, id: AssessmentId) -> Result<WizardDraft, BilanError> {
        self.assessment(id)?;
        Ok(self.store().get_draft(id)?.unwrap_or_default())
    }

    /// Merge a partial step payload and save it.
    ///
    /// With `expected_version`, a stale version yields `VersionConflict`.
    /// A save that loses a race against a concurrent writer is never
    /// re-applied: it fails with `VersionConflict` when the caller named a
    /// version and with `StateConflict` otherwise.
    pub fn save_step(
        &mut self,
        id: AssessmentId,
        step: i64,
        payload: &Value,
        expected_version: Option<u64>,
        now: Timestamp,
    ) -> Result<WizardDraft, BilanError> {
        let current = self.draft(id)?;
        if let Some(expected) = expected_version {
            if expected != current.version() {
                warn!(
                    assessment = %id,
                    expected,
                    current = current.version(),
                    "stale draft version"
                );
                return Err(BilanError::VersionConflict {
                    expected,
                    current: current.version(),
                });
            }
        }

        self.commit_step(id, &current, step, payload, expected_version, now)
    }

    /// Merge `payload` into `base` and save it conditionally on `base`'s version.
    fn commit_step(
        &mut self,
        id: AssessmentId,
        base: &WizardDraft,
        step: i64,
        payload: &Value,
        expected_version: Option<u64>,
        now: Timestamp,
    ) -> Result<WizardDraft, BilanError> {
        let merged = merge_step(base, step, payload)?;
        match self
            .store_mut()
            .save_draft(id, &merged, base.version(), now)?
        {
            DraftSave::Saved(saved) => {
                debug!(assessment = %id, step, version = saved.version(), "draft saved");
                Ok(saved)
            }
            DraftSave::Conflict { current_version } => {
                warn!(assessment = %id, current = current_version, "draft save lost a race");
                Err(match expected_version {
                    Some(expected) => BilanError::VersionConflict {
                        expected,
                        current: current_version,
                    },
                    None => BilanError::StateConflict(id),
                })
            }
        }
    }

    /// Step completion statistics and navigation state of the draft.
    pub fn draft_progress(&self, id: AssessmentId) -> Result<DraftProgress, BilanError> {
        let draft = self.draft(id)?;
        Ok(DraftProgress {
            completion: compute_step_completion(&draft),
            current_step: current_step(&draft),
            steps: step_statuses(&draft),
        })
    }

    /// Analytics summary of the draft.
    pub fn summary(&self, id: AssessmentId) -> Result<DraftSummary, BilanError> {
        Ok(summarize(&self.draft(id)?))
    }

    /// Export bundle of the draft, redacted unless `include_personal_info`.
    pub fn export(
        &self,
        id: AssessmentId,
        include_personal_info: bool,
        now: Timestamp,
    ) -> Result<DraftExport, BilanError> {
        let draft = self.draft(id)?;
        info!(assessment = %id, include_personal_info, "draft exported");
        Ok(export_draft(id, &draft, include_personal_info, now))
    }

    // =========================================================================
    // ANSWERS
    // =========================================================================

    /// Validate and upsert an answer.
    pub fn record_answer(
        &mut self,
        id: AssessmentId,
        question_id: &str,
        step_number: i64,
        answer_text: &str,
        now: Timestamp,
    ) -> Result<AnswerRecord, BilanError> {
        let submission = AnswerSubmission::new(id, question_id, step_number, answer_text)?;
        let record = self.store_mut().record_answer(submission, now)?;
        debug!(
            assessment = %id,
            question = record.question_id.as_str(),
            step = record.step_number,
            "answer recorded"
        );
        Ok(record)
    }

    /// Answers of an assessment, ordered by creation time.
    pub fn answers(&self, id: AssessmentId) -> Result<Vec<AnswerRecord>, BilanError> {
        self.assessment(id)?;
        self.store().list_answers(id)
    }

    // =========================================================================
    // PHASE GATE
    // =========================================================================

    /// Gate state and phase progress of an assessment.
    pub fn parcours(&self, id: AssessmentId) -> Result<ParcoursView, BilanError> {
        let assessment = self.assessment(id)?;
        let answers = self.store().list_answers(id)?;
        Ok(parcours(&assessment, &answers))
    }

    /// Complete `phase` of an assessment.
    ///
    /// The gate is checked on the loaded record, then the store applies the
    /// completion only if the phase flags are still the ones checked. When a
    /// concurrent writer wins, the gate is re-run on the fresh record so the
    /// caller gets the precise reason (usually `PhaseAlreadyCompleted`).
    pub fn complete_phase(
        &mut self,
        id: AssessmentId,
        phase: Phase,
        now: Timestamp,
    ) -> Result<Assessment, BilanError> {
        let loaded = self.assessment(id)?;
        if let Err(e) = check_completion(&loaded, phase) {
            warn!(assessment = %id, %phase, error = %e, "phase completion rejected");
            return Err(e);
        }

        match self
            .store_mut()
            .update_phase_completion(id, phase, &loaded.phase_completion, now)
        {
            Ok(updated) => {
                info!(
                    assessment = %id,
                    %phase,
                    status = %updated.overall_status,
                    "phase completed"
                );
                Ok(updated)
            }
            Err(BilanError::StateConflict(_)) => {
                let fresh = self.assessment(id)?;
                warn!(assessment = %id, %phase, "phase completion lost a race");
                check_completion(&fresh, phase)?;
                Err(BilanError::StateConflict(id))
            }
            Err(e) => Err(e),
        }
    }

    /// Archive a COMPLETED assessment.
    pub fn archive(&mut self, id: AssessmentId, now: Timestamp) -> Result<Assessment, BilanError> {
        let loaded = self.assessment(id)?;
        if loaded.overall_status != OverallStatus::Completed {
            return Err(BilanError::InvalidTransition {
                from: loaded.overall_status,
                to: OverallStatus::Archived,
            });
        }
        let archived = self
            .store_mut()
            .archive_assessment(id, loaded.overall_status, now)?;
        info!(assessment = %id, "assessment archived");
        Ok(archived)
    }
}

// =============================================================================
// TESTS
// =============================================================================
