//! In-memory storage backend.

use super::{
    AnswerLedger, AssessmentStore, DraftSave, conditional_archive, conditional_complete,
    sort_answers, stamp_draft,
};
use crate::answers::{AnswerRecord, AnswerSubmission};
use crate::assessment::{Assessment, PhaseCompletion};
use crate::draft::WizardDraft;
use crate::{AssessmentId, BilanError, OverallStatus, Phase, Timestamp};
use std::collections::BTreeMap;

/// Volatile store. All data is lost when the value is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    assessments: BTreeMap<AssessmentId, Assessment>,
    drafts: BTreeMap<AssessmentId, WizardDraft>,
    answers: BTreeMap<AssessmentId, Vec<AnswerRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn stored(&self, id: AssessmentId) -> Result<&Assessment, BilanError> {
        self.assessments
            .get(&id)
            .ok_or(BilanError::AssessmentNotFound(id))
    }
}

impl AssessmentStore for MemoryStore {
    fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>, BilanError> {
        Ok(self.assessments.get(&id).cloned())
    }

    fn insert_assessment(&mut self, assessment: &Assessment) -> Result<(), BilanError> {
        if self.assessments.contains_key(&assessment.id) {
            return Err(BilanError::StateConflict(assessment.id));
        }
        self.assessments.insert(assessment.id, assessment.clone());
        Ok(())
    }

    fn list_assessments(&self) -> Result<Vec<Assessment>, BilanError> {
        Ok(self.assessments.values().cloned().collect())
    }

    fn get_draft(&self, id: AssessmentId) -> Result<Option<WizardDraft>, BilanError> {
        Ok(self.drafts.get(&id).cloned())
    }

    fn save_draft(
        &mut self,
        id: AssessmentId,
        draft: &WizardDraft,
        expected_version: u64,
        now: Timestamp,
    ) -> Result<DraftSave, BilanError> {
        self.stored(id)?;
        let stored_version = self.drafts.get(&id).map_or(0, WizardDraft::version);
        let outcome = stamp_draft(draft, stored_version, expected_version, now);
        if let DraftSave::Saved(saved) = &outcome {
            self.drafts.insert(id, saved.clone());
        }
        Ok(outcome)
    }

    fn update_phase_completion(
        &mut self,
        id: AssessmentId,
        phase: Phase,
        expected_prior: &PhaseCompletion,
        now: Timestamp,
    ) -> Result<Assessment, BilanError> {
        let next = conditional_complete(self.stored(id)?, phase, expected_prior, now)?;
        self.assessments.insert(id, next.clone());
        Ok(next)
    }

    fn archive_assessment(
        &mut self,
        id: AssessmentId,
        expected_prior_status: OverallStatus,
        now: Timestamp,
    ) -> Result<Assessment, BilanError> {
        let next = conditional_archive(self.stored(id)?, expected_prior_status, now)?;
        self.assessments.insert(id, next.clone());
        Ok(next)
    }
}

impl AnswerLedger for MemoryStore {
    fn list_answers(&self, id: AssessmentId) -> Result<Vec<AnswerRecord>, BilanError> {
        let mut answers = self.answers.get(&id).cloned().unwrap_or_default();
        sort_answers(&mut answers);
        Ok(answers)
    }

    fn record_answer(
        &mut self,
        submission: AnswerSubmission,
        now: Timestamp,
    ) -> Result<AnswerRecord, BilanError> {
        let id = submission.assessment_id;
        self.stored(id)?;
        let answers = self.answers.entry(id).or_default();
        Ok(submission.upsert_into(answers, now))
    }
}
