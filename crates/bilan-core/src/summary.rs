//! # Summary / Export
//!
//! Read-only reporting views over a draft: item counts, presence flags,
//! competency extraction and the redacted export copy.
//!
//! Nothing here feeds the phase gate, and nothing here is written back.

use crate::completion::{StepCompletion, compute_step_completion};
use crate::draft::{Competency, StepDocument, StepIndex, WizardDraft};
use crate::primitives::REDACTION_MARKER;
use crate::{AssessmentId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// =============================================================================
// SUMMARY
// =============================================================================

/// Counts of list-valued fields in a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    pub skills: usize,
    pub experiences: usize,
    pub competencies: usize,
    /// `skills + experiences + competencies`.
    pub total_items: usize,
    /// Length of every list-valued field, keyed by step key then field name.
    pub list_fields: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Analytics summary of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSummary {
    pub completion: StepCompletion,
    pub items: ItemCounts,
    pub has_personal_info: bool,
    pub has_career_goals: bool,
    pub has_personality: bool,
    pub has_action_plan: bool,
}

/// A value counts as present when it carries content.
fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn non_empty_map(map: Option<&Map<String, Value>>) -> bool {
    map.is_some_and(|m| !m.is_empty())
}

/// Count list items across the draft.
#[must_use]
pub fn count_items(draft: &WizardDraft) -> ItemCounts {
    let mut counts = ItemCounts::default();

    for (step, document) in draft.steps() {
        match document {
            StepDocument::SkillsExperience(doc) => {
                counts.skills = doc.skills.as_ref().map_or(0, Vec::len);
                counts.experiences = doc.experiences.as_ref().map_or(0, Vec::len);
            }
            StepDocument::CompetencyInventory(doc) => {
                counts.competencies = doc.competencies.as_ref().map_or(0, Vec::len);
            }
            _ => {}
        }

        // A document always flattens to a mapping; a failure here only
        // drops this step's per-field counts.
        let lists: BTreeMap<String, usize> = document
            .to_fields()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Array(items) => Some((key, items.len())),
                _ => None,
            })
            .collect();
        if !lists.is_empty() {
            counts.list_fields.insert(step.key().to_string(), lists);
        }
    }

    counts.total_items = counts
        .skills
        .saturating_add(counts.experiences)
        .saturating_add(counts.competencies);
    counts
}

/// Build the analytics summary of a draft.
#[must_use]
pub fn summarize(draft: &WizardDraft) -> DraftSummary {
    let mut summary = DraftSummary {
        completion: compute_step_completion(draft),
        items: count_items(draft),
        has_personal_info: false,
        has_career_goals: false,
        has_personality: false,
        has_action_plan: false,
    };

    for (_, document) in draft.steps() {
        match document {
            StepDocument::IdentityGoals(doc) => {
                summary.has_personal_info =
                    doc.personal_info.as_ref().is_some_and(|p| !p.is_empty());
                summary.has_career_goals = doc.career_goals.as_ref().is_some_and(has_content);
            }
            StepDocument::PersonalityProfile(doc) => {
                summary.has_personality = non_empty_map(doc.personality.as_ref());
            }
            StepDocument::ActionPlan(doc) => {
                summary.has_action_plan = non_empty_map(doc.action_plan.as_ref());
            }
            StepDocument::SkillsExperience(_) | StepDocument::CompetencyInventory(_) => {}
        }
    }

    summary
}

// =============================================================================
// REDACTION
// =============================================================================

/// Copy of `draft` safe to hand to third parties.
///
/// With `include_personal_info == false`, the contact identifiers of step 1
/// `personal_info` (email, phone, address) are replaced by the redaction
/// marker. Every other key, and the shape of the document, is kept.
#[must_use]
pub fn redact(draft: &WizardDraft, include_personal_info: bool) -> WizardDraft {
    let mut copy = draft.clone();
    if include_personal_info {
        return copy;
    }

    let identity = StepIndex::ALL[0];
    if let Some(StepDocument::IdentityGoals(doc)) = copy.step_mut(identity) {
        if let Some(info) = doc.personal_info.as_mut() {
            info.email = Some(REDACTION_MARKER.to_string());
            info.phone = Some(REDACTION_MARKER.to_string());
            info.address = Some(Value::String(REDACTION_MARKER.to_string()));
        }
    }
    copy
}

// =============================================================================
// COMPETENCY EXTRACTION
// =============================================================================

/// A normalized competency from the step 3 inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyRecord {
    pub skill_name: String,
    pub category: String,
    pub self_assessment_level: Option<u8>,
    pub self_interest_level: Option<u8>,
    pub context: String,
}

impl CompetencyRecord {
    fn from_entry(entry: &Competency) -> Option<Self> {
        let skill_name = entry
            .skill_name
            .as_deref()
            .or(entry.name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        Some(Self {
            skill_name: skill_name.to_string(),
            category: entry
                .category
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "other".to_string()),
            self_assessment_level: entry.self_assessment_level.or(entry.level),
            self_interest_level: entry.self_interest_level.or(entry.interest),
            context: entry.context.clone().unwrap_or_default(),
        })
    }
}

/// Normalize the competency inventory; entries without a name are skipped.
#[must_use]
pub fn extract_competencies(draft: &WizardDraft) -> Vec<CompetencyRecord> {
    let inventory = StepIndex::ALL[2];
    match draft.step(inventory) {
        Some(StepDocument::CompetencyInventory(doc)) => doc
            .competencies
            .iter()
            .flatten()
            .filter_map(CompetencyRecord::from_entry)
            .collect(),
        _ => Vec::new(),
    }
}

// =============================================================================
// EXPORT
// =============================================================================

/// The export bundle of an assessment draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftExport {
    pub assessment_id: AssessmentId,
    pub exported_at: Timestamp,
    pub personal_info_included: bool,
    pub draft: WizardDraft,
    pub summary: DraftSummary,
    pub competencies: Vec<CompetencyRecord>,
}

/// Assemble the export bundle. Redaction applies to the draft copy only.
#[must_use]
pub fn export_draft(
    assessment_id: AssessmentId,
    draft: &WizardDraft,
    include_personal_info: bool,
    now: Timestamp,
) -> DraftExport {
    DraftExport {
        assessment_id,
        exported_at: now,
        personal_info_included: include_personal_info,
        draft: redact(draft, include_personal_info),
        summary: summarize(draft),
        competencies: extract_competencies(draft),
    }
}

// =============================================================================
// TESTS
// =============================================================================
