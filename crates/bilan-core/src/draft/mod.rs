//! # Wizard Draft
//!
//! The per-assessment document holding every wizard step payload, and the
//! Draft Merge Engine that folds partial submissions into it.
//!
//! ## Merge Semantics
//!
//! `merge_step` is a shallow union scoped to one step:
//! - keys present in the payload overwrite the same keys of the step
//! - a key set to `null` is removed from the step, named or not
//! - every other key of that step is preserved
//! - other steps are untouched
//!
//! The merge is pure: it never touches `version` or `updated_at`, which are
//! stamped by the store on save. It is therefore idempotent for identical
//! payloads and commutative for payloads touching disjoint keys.

mod step;

pub use step::{
    ActionPlan, Competency, CompetencyInventory, IdentityGoals, PersonalInfo, PersonalityProfile,
    SkillsExperience, StepDocument, StepIndex, StepKind,
};

use crate::primitives::{MAX_KEY_LENGTH, MAX_PAYLOAD_KEYS};
use crate::{BilanError, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// =============================================================================
// WIZARD DRAFT
// =============================================================================

/// The semi-structured draft of one assessment.
///
/// Steps are keyed by their fixed slot; an absent step is simply incomplete.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "DraftDocument")]
pub struct WizardDraft {
    steps: BTreeMap<StepIndex, StepDocument>,
    version: u64,
    updated_at: Option<Timestamp>,
}

impl WizardDraft {
    /// Create an empty draft (version 0, never saved).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the document stored for a step.
    #[must_use]
    pub fn step(&self, step: StepIndex) -> Option<&StepDocument> {
        self.steps.get(&step)
    }

    /// Iterate over stored steps in slot order.
    pub fn steps(&self) -> impl Iterator<Item = (StepIndex, &StepDocument)> {
        self.steps.iter().map(|(k, v)| (*k, v))
    }

    /// Check if a step exists and is non-empty.
    #[must_use]
    pub fn is_step_complete(&self, step: StepIndex) -> bool {
        self.steps.get(&step).is_some_and(StepDocument::is_complete)
    }

    /// Optimistic-concurrency version; 0 until the first save.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Time of the last successful save.
    #[must_use]
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    /// Return a copy stamped with a new version and save time.
    ///
    /// Only stores call this, after their version check has passed.
    #[must_use]
    pub(crate) fn stamped(&self, version: u64, at: Timestamp) -> Self {
        let mut next = self.clone();
        next.version = version;
        next.updated_at = Some(at);
        next
    }

    /// Mutable access for export-only transformations (redaction).
    pub(crate) fn step_mut(&mut self, step: StepIndex) -> Option<&mut StepDocument> {
        self.steps.get_mut(&step)
    }
}

// =============================================================================
// PERSISTED SHAPE
// =============================================================================

/// Owned persisted form: `{version, updated_at, steps: {"step1": {...}}}`.
#[derive(Debug, Deserialize)]
struct DraftDocument {
    #[serde(default)]
    version: u64,
    #[serde(default)]
    updated_at: Option<Timestamp>,
    #[serde(default)]
    steps: BTreeMap<String, Map<String, Value>>,
}

/// Borrowed persisted form used for serialization.
#[derive(Serialize)]
struct DraftDocumentRef<'a> {
    version: u64,
    updated_at: Option<Timestamp>,
    steps: BTreeMap<&'static str, &'a StepDocument>,
}

impl TryFrom<DraftDocument> for WizardDraft {
    type Error = BilanError;

    fn try_from(doc: DraftDocument) -> Result<Self, Self::Error> {
        let mut steps = BTreeMap::new();
        for (key, fields) in doc.steps {
            let step = StepIndex::from_key(&key)?;
            steps.insert(step, StepDocument::from_fields(step, fields)?);
        }
        Ok(Self {
            steps,
            version: doc.version,
            updated_at: doc.updated_at,
        })
    }
}

impl Serialize for WizardDraft {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DraftDocumentRef {
            version: self.version,
            updated_at: self.updated_at,
            steps: self.steps.iter().map(|(k, v)| (k.key(), v)).collect(),
        }
        .serialize(serializer)
    }
}

// =============================================================================
// MERGE ENGINE
// =============================================================================

/// Check that a partial payload is a bounded key/value mapping.
fn payload_fields(payload: &Value) -> Result<&Map<String, Value>, BilanError> {
    let Value::Object(map) = payload else {
        return Err(BilanError::InvalidPayloadShape(format!(
            "expected a key/value mapping, got {}",
            json_type_name(payload)
        )));
    };
    if map.len() > MAX_PAYLOAD_KEYS {
        return Err(BilanError::InvalidPayloadShape(format!(
            "payload has {} keys, maximum is {}",
            map.len(),
            MAX_PAYLOAD_KEYS
        )));
    }
    if let Some(key) = map.keys().find(|k| k.is_empty() || k.len() > MAX_KEY_LENGTH) {
        return Err(BilanError::InvalidPayloadShape(format!(
            "invalid key of length {}",
            key.len()
        )));
    }
    Ok(map)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Merge a partial payload into one step of a draft.
///
/// Returns the new draft; `draft` itself is never modified, so a failure
/// leaves the caller's state exactly as it was.
pub fn merge_step(
    draft: &WizardDraft,
    step: i64,
    payload: &Value,
) -> Result<WizardDraft, BilanError> {
    let index = StepIndex::new(step)?;
    let patch = payload_fields(payload)?;

    let mut fields = match draft.step(index) {
        Some(existing) => existing.to_fields()?,
        None => Map::new(),
    };
    for (key, value) in patch {
        if value.is_null() {
            fields.remove(key);
        } else {
            fields.insert(key.clone(), value.clone());
        }
    }
    let document = StepDocument::from_fields(index, fields)?;

    let mut next = draft.clone();
    next.steps.insert(index, document);
    Ok(next)
}

// =============================================================================
// TESTS
// =============================================================================
