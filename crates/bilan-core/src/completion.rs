//! # Completion Calculator (wizard steps)
//!
//! Fine-grained completion statistics derived from a draft.
//!
//! All functions here are pure: same draft in, same statistics out.
//! An absent step is incomplete, never an error.

use crate::draft::{StepIndex, WizardDraft};
use crate::primitives::{TOTAL_STEPS, rounded_percent};
use serde::{Deserialize, Serialize};

/// Completion statistics of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCompletion {
    pub total_steps: u8,
    pub completed_steps: u8,
    /// `round(completed_steps / 5 * 100)`, always within 0..=100.
    pub percentage: u8,
    pub completed: Vec<StepIndex>,
    pub missing: Vec<StepIndex>,
}

/// Navigation status of one wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Current,
    Pending,
}

/// Compute which steps are complete.
#[must_use]
pub fn compute_step_completion(draft: &WizardDraft) -> StepCompletion {
    let (completed, missing): (Vec<StepIndex>, Vec<StepIndex>) = StepIndex::ALL
        .iter()
        .copied()
        .partition(|step| draft.is_step_complete(*step));

    let completed_steps = completed.len() as u8;
    let percentage = rounded_percent(completed.len(), TOTAL_STEPS as usize).min(100) as u8;

    StepCompletion {
        total_steps: TOTAL_STEPS,
        completed_steps,
        percentage,
        completed,
        missing,
    }
}

/// The step the beneficiary should work on.
///
/// - 0 when nothing is complete yet
/// - the lowest-numbered incomplete step otherwise
/// - 5 when every step is complete
#[must_use]
pub fn current_step(draft: &WizardDraft) -> u8 {
    let completion = compute_step_completion(draft);
    if completion.completed_steps == 0 {
        return 0;
    }
    completion
        .missing
        .iter()
        .map(|s| s.get())
        .min()
        .unwrap_or(TOTAL_STEPS)
}

/// Status of `step` for wizard navigation.
///
/// A complete step is `Completed` wherever it sits; the step equal to
/// [`current_step`] is `Current`; everything else is `Pending`.
#[must_use]
pub fn step_status(draft: &WizardDraft, step: StepIndex) -> StepStatus {
    if draft.is_step_complete(step) {
        StepStatus::Completed
    } else if step.get() == current_step(draft) {
        StepStatus::Current
    } else {
        StepStatus::Pending
    }
}

/// Statuses of all five steps, in order.
#[must_use]
pub fn step_statuses(draft: &WizardDraft) -> Vec<(StepIndex, StepStatus)> {
    StepIndex::ALL
        .iter()
        .map(|step| (*step, step_status(draft, *step)))
        .collect()
}

/// Check if every step of the draft is complete.
#[must_use]
pub fn is_draft_complete(draft: &WizardDraft) -> bool {
    StepIndex::ALL.iter().all(|step| draft.is_step_complete(*step))
}

// =============================================================================
// TESTS
// =============================================================================
