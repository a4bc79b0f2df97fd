//! # Step Documents
//!
//! The five fixed wizard slots and their typed payloads.
//!
//! | Step | Slot | Named fields |
//! |------|------|--------------|
//! | 1 | Identity & goals | `personal_info`, `career_goals` |
//! | 2 | Skills & experience | `skills`, `experiences` |
//! | 3 | Competency inventory | `competencies` |
//! | 4 | Personality | `personality` |
//! | 5 | Action plan | `action_plan` |
//!
//! Named fields are optional and shape-checked when a document is built.
//! Any other key is carried in `extra` and passed through unmodified.

use crate::BilanError;
use crate::primitives::TOTAL_STEPS;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// STEP INDEX
// =============================================================================

/// A wizard step slot, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StepIndex(u8);

impl StepIndex {
    /// All step slots in order.
    pub const ALL: [StepIndex; TOTAL_STEPS as usize] = [
        StepIndex(1),
        StepIndex(2),
        StepIndex(3),
        StepIndex(4),
        StepIndex(5),
    ];

    /// Validate a raw step number.
    pub fn new(n: i64) -> Result<Self, BilanError> {
        if (1..=i64::from(TOTAL_STEPS)).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(BilanError::InvalidStepIndex(n))
        }
    }

    /// Raw step number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Key under which the step is stored in the draft document.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self.0 {
            1 => "step1",
            2 => "step2",
            3 => "step3",
            4 => "step4",
            _ => "step5",
        }
    }

    /// Parse a storage key (`step1`..`step5`).
    pub fn from_key(key: &str) -> Result<Self, BilanError> {
        let n = key
            .strip_prefix("step")
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or_else(|| BilanError::InvalidPayloadShape(format!("unknown step key '{key}'")))?;
        Self::new(n)
    }

    /// Semantic slot of this step.
    #[must_use]
    pub const fn kind(self) -> StepKind {
        match self.0 {
            1 => StepKind::IdentityGoals,
            2 => StepKind::SkillsExperience,
            3 => StepKind::CompetencyInventory,
            4 => StepKind::PersonalityProfile,
            _ => StepKind::ActionPlan,
        }
    }
}

impl TryFrom<u8> for StepIndex {
    type Error = BilanError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(i64::from(n))
    }
}

impl From<StepIndex> for u8 {
    fn from(step: StepIndex) -> Self {
        step.0
    }
}

impl std::fmt::Display for StepIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic slot names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    IdentityGoals,
    SkillsExperience,
    CompetencyInventory,
    PersonalityProfile,
    ActionPlan,
}

impl StepKind {
    /// Human-readable slot name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            StepKind::IdentityGoals => "Identity & career goals",
            StepKind::SkillsExperience => "Skills & experience",
            StepKind::CompetencyInventory => "Competency inventory",
            StepKind::PersonalityProfile => "Personality",
            StepKind::ActionPlan => "Action plan",
        }
    }
}

// =============================================================================
// TYPED PAYLOADS
// =============================================================================

/// Contact block of step 1.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersonalInfo {
    /// Check if no key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.extra.is_empty()
    }
}

/// Step 1: identity and career goals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdentityGoals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_info: Option<PersonalInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career_goals: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Step 2: skills and work experience.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkillsExperience {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiences: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the competency inventory.
///
/// Clients have sent both `skill_name`/`self_assessment_level`/
/// `self_interest_level` and the short `name`/`level`/`interest` forms;
/// both are accepted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Competency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_assessment_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_interest_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Step 3: competency inventory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompetencyInventory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competencies: Option<Vec<Competency>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Step 4: personality profile (test results, self-description).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonalityProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Step 5: action plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_plan: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// STEP DOCUMENT
// =============================================================================

/// The payload stored for one wizard step.
///
/// Serializes as the bare key/value mapping; the variant is implied by the
/// step slot it is stored under.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepDocument {
    IdentityGoals(IdentityGoals),
    SkillsExperience(SkillsExperience),
    CompetencyInventory(CompetencyInventory),
    PersonalityProfile(PersonalityProfile),
    ActionPlan(ActionPlan),
}

impl StepDocument {
    /// Build the typed document for `step` from a key/value mapping.
    ///
    /// Named fields are shape-checked; unknown keys land in `extra`.
    /// A key whose value is `null` is treated as absent, named or not.
    pub fn from_fields(
        step: StepIndex,
        mut fields: Map<String, Value>,
    ) -> Result<Self, BilanError> {
        fields.retain(|_, value| !value.is_null());
        let value = Value::Object(fields);
        let shape_error =
            |e: serde_json::Error| BilanError::InvalidPayloadShape(format!("step {step}: {e}"));

        Ok(match step.kind() {
            StepKind::IdentityGoals => {
                Self::IdentityGoals(serde_json::from_value(value).map_err(shape_error)?)
            }
            StepKind::SkillsExperience => {
                Self::SkillsExperience(serde_json::from_value(value).map_err(shape_error)?)
            }
            StepKind::CompetencyInventory => {
                Self::CompetencyInventory(serde_json::from_value(value).map_err(shape_error)?)
            }
            StepKind::PersonalityProfile => {
                Self::PersonalityProfile(serde_json::from_value(value).map_err(shape_error)?)
            }
            StepKind::ActionPlan => {
                Self::ActionPlan(serde_json::from_value(value).map_err(shape_error)?)
            }
        })
    }

    /// Flatten the document back into its key/value mapping.
    pub fn to_fields(&self) -> Result<Map<String, Value>, BilanError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(BilanError::SerializationError(format!(
                "step document serialized to non-object: {other}"
            ))),
            Err(e) => Err(BilanError::SerializationError(e.to_string())),
        }
    }

    /// The slot this document belongs to.
    #[must_use]
    pub fn step(&self) -> StepIndex {
        StepIndex(match self {
            Self::IdentityGoals(_) => 1,
            Self::SkillsExperience(_) => 2,
            Self::CompetencyInventory(_) => 3,
            Self::PersonalityProfile(_) => 4,
            Self::ActionPlan(_) => 5,
        })
    }

    /// Number of keys present in the document.
    #[must_use]
    pub fn populated_keys(&self) -> usize {
        let named = match self {
            Self::IdentityGoals(d) => {
                usize::from(d.personal_info.is_some()) + usize::from(d.career_goals.is_some())
            }
            Self::SkillsExperience(d) => {
                usize::from(d.skills.is_some()) + usize::from(d.experiences.is_some())
            }
            Self::CompetencyInventory(d) => usize::from(d.competencies.is_some()),
            Self::PersonalityProfile(d) => usize::from(d.personality.is_some()),
            Self::ActionPlan(d) => usize::from(d.action_plan.is_some()),
        };
        named.saturating_add(self.extra().len())
    }

    /// A step counts as complete when at least one key is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.populated_keys() > 0
    }

    /// Keys not known to the typed schema.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        match self {
            Self::IdentityGoals(d) => &d.extra,
            Self::SkillsExperience(d) => &d.extra,
            Self::CompetencyInventory(d) => &d.extra,
            Self::PersonalityProfile(d) => &d.extra,
            Self::ActionPlan(d) => &d.extra,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
