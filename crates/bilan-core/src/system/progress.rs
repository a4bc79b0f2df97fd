//! # Phase Progress
//!
//! Coarse progress bars fed by the answer ledger, and the parcours view
//! that shows them next to the gate state.
//!
//! | Phase | Answer steps | Expected answers |
//! |-------|--------------|------------------|
//! | PRELIMINARY | 1, 2 | 6 |
//! | INVESTIGATION | 3, 4 | 6 |
//! | CONCLUSION | 5 | 3 |
//!
//! Progress is informational only. It never gates a phase.

use super::gate::current_phase;
use crate::answers::AnswerRecord;
use crate::assessment::Assessment;
use crate::primitives::{
    CONCLUSION_EXPECTED_ANSWERS, INVESTIGATION_EXPECTED_ANSWERS, PRELIMINARY_EXPECTED_ANSWERS,
    rounded_percent,
};
use crate::{OverallStatus, Phase, Timestamp};
use serde::{Deserialize, Serialize};

/// Answer step numbers that count towards a phase.
#[must_use]
pub const fn answer_steps(phase: Phase) -> &'static [u8] {
    match phase {
        Phase::Preliminary => &[1, 2],
        Phase::Investigation => &[3, 4],
        Phase::Conclusion => &[5],
    }
}

/// Number of answers that fill a phase's bar.
#[must_use]
pub const fn expected_answers(phase: Phase) -> usize {
    match phase {
        Phase::Preliminary => PRELIMINARY_EXPECTED_ANSWERS,
        Phase::Investigation => INVESTIGATION_EXPECTED_ANSWERS,
        Phase::Conclusion => CONCLUSION_EXPECTED_ANSWERS,
    }
}

/// Progress of `phase` as a whole percentage, capped at 100.
#[must_use]
pub fn compute_phase_progress(answers: &[AnswerRecord], phase: Phase) -> u8 {
    let steps = answer_steps(phase);
    let count = answers
        .iter()
        .filter(|a| steps.contains(&a.step_number))
        .count();
    rounded_percent(count, expected_answers(phase)).min(100) as u8
}

// =============================================================================
// PARCOURS VIEW
// =============================================================================

/// Display state of a phase in the parcours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Locked,
    InProgress,
    Completed,
}

/// One phase as shown to the beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseView {
    pub phase: Phase,
    pub state: PhaseState,
    pub completed_at: Option<Timestamp>,
    pub progress: u8,
}

/// Gate state and progress of an assessment, side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcoursView {
    pub overall_status: OverallStatus,
    /// `None` once every phase is completed.
    pub current_phase: Option<Phase>,
    pub phases: Vec<PhaseView>,
    /// Mean of the three phase bars, rounded half up.
    pub overall_progress: u8,
}

/// Build the parcours view of an assessment.
#[must_use]
pub fn parcours(assessment: &Assessment, answers: &[AnswerRecord]) -> ParcoursView {
    let current = current_phase(assessment);

    let phases: Vec<PhaseView> = Phase::ALL
        .into_iter()
        .map(|phase| {
            let record = assessment.phase_completion.get(phase);
            let state = if record.completed {
                PhaseState::Completed
            } else if current == Some(phase) {
                PhaseState::InProgress
            } else {
                PhaseState::Locked
            };
            PhaseView {
                phase,
                state,
                completed_at: record.completed_at,
                progress: compute_phase_progress(answers, phase),
            }
        })
        .collect();

    let sum: usize = phases.iter().map(|p| usize::from(p.progress)).sum();
    let overall_progress = rounded_percent(sum, phases.len().saturating_mul(100)).min(100) as u8;

    ParcoursView {
        overall_status: assessment.overall_status,
        current_phase: current,
        phases,
        overall_progress,
    }
}
