//! # Phase Gate
//!
//! The one-way state machine over the three assessment phases.
//!
//! | Status | Open phase | Next transition |
//! |--------|------------|-----------------|
//! | PRELIMINARY | Preliminary | complete Preliminary |
//! | INVESTIGATION | Investigation | complete Investigation |
//! | CONCLUSION | Conclusion | complete Conclusion → COMPLETED |
//! | COMPLETED | - | archive → ARCHIVED |
//! | ARCHIVED | - | - |
//!
//! Completion is always explicit. The gate never looks at answer progress or
//! draft completion: a phase with zero answers can be completed, and a phase
//! at 100% stays open until someone completes it.
//!
//! Every function here returns a new `Assessment`; the input is never
//! modified, so a rejected transition cannot leave partial state behind.

use crate::assessment::{Assessment, PhaseCompletionRecord};
use crate::{BilanError, OverallStatus, Phase, Timestamp};

/// The phase currently open for completion, or `None` once all are done.
#[must_use]
pub fn current_phase(assessment: &Assessment) -> Option<Phase> {
    assessment.phase_completion.first_open()
}

/// Check if content of `phase` may be shown: every predecessor is completed.
#[must_use]
pub fn is_phase_accessible(assessment: &Assessment, phase: Phase) -> bool {
    Phase::ALL
        .into_iter()
        .take_while(|p| *p < phase)
        .all(|p| assessment.phase_completion.is_completed(p))
}

/// Validate that `phase` may be completed now, without building the result.
///
/// A duplicate completion is reported before ordering, so completing an
/// already completed phase always yields `PhaseAlreadyCompleted`.
pub fn check_completion(assessment: &Assessment, phase: Phase) -> Result<(), BilanError> {
    if assessment.phase_completion.is_completed(phase) {
        return Err(BilanError::PhaseAlreadyCompleted(phase));
    }
    match current_phase(assessment) {
        Some(current) if current == phase => Ok(()),
        Some(current) => Err(BilanError::PhaseOutOfOrder {
            requested: phase,
            current,
        }),
        // Unreachable for a valid record: every phase is completed, so the
        // duplicate check above already fired.
        None => Err(BilanError::PhaseAlreadyCompleted(phase)),
    }
}

/// Complete `phase` at `now`.
///
/// Sets the phase record, advances `overall_status` and, for CONCLUSION,
/// stamps the top-level `completed_at`.
pub fn complete_phase(
    assessment: &Assessment,
    phase: Phase,
    now: Timestamp,
) -> Result<Assessment, BilanError> {
    check_completion(assessment, phase)?;

    let mut next = assessment.clone();
    next.phase_completion
        .set(phase, PhaseCompletionRecord::completed_at(now));
    next.overall_status = next.phase_completion.derived_status();
    if next.overall_status == OverallStatus::Completed {
        next.completed_at = Some(now);
    }
    next.updated_at = now;
    Ok(next)
}

/// Move a COMPLETED assessment to ARCHIVED.
pub fn archive(assessment: &Assessment, now: Timestamp) -> Result<Assessment, BilanError> {
    if assessment.overall_status != OverallStatus::Completed {
        return Err(BilanError::InvalidTransition {
            from: assessment.overall_status,
            to: OverallStatus::Archived,
        });
    }

    let mut next = assessment.clone();
    next.overall_status = OverallStatus::Archived;
    next.archived_at = Some(now);
    next.updated_at = now;
    Ok(next)
}

// =============================================================================
// TESTS
// =============================================================================
