//! # Assessment Record
//!
//! The assessment row as the engine sees it: identity, ownership, the three
//! embedded phase-completion records and the cached overall status.
//!
//! Mutation of phase state goes through [`crate::system`]; this module only
//! defines the data and checks its invariants.

use crate::{AssessmentId, BilanError, OverallStatus, Phase, Timestamp, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// PHASE COMPLETION
// =============================================================================

/// Completion record of one phase. `completed_at` is set once, never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseCompletionRecord {
    pub completed: bool,
    pub completed_at: Option<Timestamp>,
}

impl PhaseCompletionRecord {
    /// A record completed at `at`.
    #[must_use]
    pub const fn completed_at(at: Timestamp) -> Self {
        Self {
            completed: true,
            completed_at: Some(at),
        }
    }
}

/// The three phase records, keyed by phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseCompletion {
    pub preliminary: PhaseCompletionRecord,
    pub investigation: PhaseCompletionRecord,
    pub conclusion: PhaseCompletionRecord,
}

impl PhaseCompletion {
    /// Record of a phase.
    #[must_use]
    pub const fn get(&self, phase: Phase) -> &PhaseCompletionRecord {
        match phase {
            Phase::Preliminary => &self.preliminary,
            Phase::Investigation => &self.investigation,
            Phase::Conclusion => &self.conclusion,
        }
    }

    pub(crate) fn set(&mut self, phase: Phase, record: PhaseCompletionRecord) {
        match phase {
            Phase::Preliminary => self.preliminary = record,
            Phase::Investigation => self.investigation = record,
            Phase::Conclusion => self.conclusion = record,
        }
    }

    /// Check if a phase is completed.
    #[must_use]
    pub const fn is_completed(&self, phase: Phase) -> bool {
        self.get(phase).completed
    }

    /// First phase (in gate order) not yet completed.
    #[must_use]
    pub fn first_open(&self) -> Option<Phase> {
        Phase::ALL.into_iter().find(|p| !self.is_completed(*p))
    }

    /// Status derived from the completion flags alone.
    #[must_use]
    pub fn derived_status(&self) -> OverallStatus {
        self.first_open()
            .map(|p| p.as_status())
            .unwrap_or(OverallStatus::Completed)
    }
}

// =============================================================================
// ASSESSMENT
// =============================================================================

/// A competency assessment (bilan) of one beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
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

impl Assessment {
    /// A fresh assessment in PRELIMINARY.
    #[must_use]
    pub fn new(
        id: AssessmentId,
        owner_id: UserId,
        assigned_consultant_id: Option<UserId>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            owner_id,
            assigned_consultant_id,
            overall_status: OverallStatus::Preliminary,
            phase_completion: PhaseCompletion::default(),
            completed_at: None,
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if `user` may mutate this assessment (owner or assigned consultant).
    #[must_use]
    pub fn is_participant(&self, user: UserId) -> bool {
        self.owner_id == user || self.assigned_consultant_id == Some(user)
    }

    /// Verify the record's invariants.
    ///
    /// - completed phases form a prefix of the gate order
    /// - a completed phase has a timestamp, an open one has none
    /// - `overall_status` matches the flags (ARCHIVED only once all are done)
    /// - `completed_at` is set iff every phase is completed
    pub fn validate(&self) -> Result<(), BilanError> {
        let flags = &self.phase_completion;

        let mut seen_open = false;
        for phase in Phase::ALL {
            let record = flags.get(phase);
            if record.completed && seen_open {
                return Err(BilanError::CorruptRecord(format!(
                    "{}: {} completed after an open phase",
                    self.id, phase
                )));
            }
            if record.completed != record.completed_at.is_some() {
                return Err(BilanError::CorruptRecord(format!(
                    "{}: {} flag and timestamp disagree",
                    self.id, phase
                )));
            }
            seen_open |= !record.completed;
        }

        let derived = flags.derived_status();
        let status_ok = match self.overall_status {
            OverallStatus::Archived => derived == OverallStatus::Completed,
            status => status == derived,
        };
        if !status_ok {
            return Err(BilanError::CorruptRecord(format!(
                "{}: status {} does not match phase flags ({})",
                self.id, self.overall_status, derived
            )));
        }

        if self.completed_at.is_some() != (derived == OverallStatus::Completed) {
            return Err(BilanError::CorruptRecord(format!(
                "{}: completion timestamp does not match phase flags",
                self.id
            )));
        }
        if self.archived_at.is_some() != (self.overall_status == OverallStatus::Archived) {
            return Err(BilanError::CorruptRecord(format!(
                "{}: archive timestamp does not match status",
                self.id
            )));
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
