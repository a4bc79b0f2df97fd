//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the progression engine:
//! - Identifiers (`AssessmentId`, `UserId`, `QuestionId`)
//! - Phases and the cached overall status (`Phase`, `OverallStatus`)
//! - Error types (`BilanError`, `ErrorKind`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Never read the clock; timestamps are passed in by the caller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Wall-clock instant used for every timestamp in the engine.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier of an assessment (bilan).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub Uuid);

impl AssessmentId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, BilanError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| BilanError::InvalidIdentifier(format!("{s}: {e}")))
    }

    /// Raw 128-bit value (storage key).
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl std::fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a platform user (beneficiary or consultant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Parse an identifier from its hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, BilanError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| BilanError::InvalidIdentifier(format!("{s}: {e}")))
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a question in the answer ledger.
///
/// Question ids come from the questionnaire catalogue and are opaque here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    /// Create a question id from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// PHASES
// =============================================================================

/// The three gated macro-stages of an assessment, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Preliminary,
    Investigation,
    Conclusion,
}

impl Phase {
    /// All phases in gate order.
    pub const ALL: [Phase; 3] = [Phase::Preliminary, Phase::Investigation, Phase::Conclusion];

    /// Parse a phase name. Accepts the canonical upper-case names, their
    /// lower-case forms, the French route name `preliminaire` and the
    /// 1-based position.
    pub fn parse(s: &str) -> Result<Self, BilanError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preliminary" | "preliminaire" | "1" => Ok(Phase::Preliminary),
            "investigation" | "2" => Ok(Phase::Investigation),
            "conclusion" | "3" => Ok(Phase::Conclusion),
            _ => Err(BilanError::UnknownPhase(s.to_string())),
        }
    }

    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Preliminary => "PRELIMINARY",
            Phase::Investigation => "INVESTIGATION",
            Phase::Conclusion => "CONCLUSION",
        }
    }

    /// The overall status an assessment shows while this phase is open.
    #[must_use]
    pub const fn as_status(&self) -> OverallStatus {
        match self {
            Phase::Preliminary => OverallStatus::Preliminary,
            Phase::Investigation => OverallStatus::Investigation,
            Phase::Conclusion => OverallStatus::Conclusion,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Cached lifecycle status of an assessment.
///
/// The first four values are derived from phase completion; `Archived` is
/// set by an external actor once the assessment is `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Preliminary,
    Investigation,
    Conclusion,
    Completed,
    Archived,
}

impl OverallStatus {
    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Preliminary => "PRELIMINARY",
            OverallStatus::Investigation => "INVESTIGATION",
            OverallStatus::Conclusion => "CONCLUSION",
            OverallStatus::Completed => "COMPLETED",
            OverallStatus::Archived => "ARCHIVED",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse classification used by callers to map errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: step index, payload shape, identifiers.
    Validation,
    /// The request conflicts with the current state (gate ordering, versions).
    Conflict,
    /// The assessment does not exist.
    NotFound,
    /// Storage, serialization or configuration failure.
    Internal,
}

/// Errors that can occur in the progression engine.
///
/// - No silent failures
/// - Every operation validates fully before writing, so an error never
///   leaves state partially mutated
#[derive(Debug, Error)]
pub enum BilanError {
    /// Wizard step index outside 1..=5.
    #[error("Invalid step index: {0} (expected 1..=5)")]
    InvalidStepIndex(i64),

    /// Step payload is not a key/value mapping, or a named field has the wrong shape.
    #[error("Invalid payload shape: {0}")]
    InvalidPayloadShape(String),

    /// Answer submission rejected at the boundary.
    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    /// Identifier could not be parsed.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Phase name or number not recognised.
    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    /// The requested phase is not the current one (a predecessor is open).
    #[error("Phase {requested} cannot be completed before {current}")]
    PhaseOutOfOrder { requested: Phase, current: Phase },

    /// The requested phase was already completed.
    #[error("Phase {0} is already completed")]
    PhaseAlreadyCompleted(Phase),

    /// Lifecycle transition not allowed from the current status.
    #[error("Cannot move assessment from {from} to {to}")]
    InvalidTransition {
        from: OverallStatus,
        to: OverallStatus,
    },

    /// Caller's draft version is stale.
    #[error("Draft version conflict: expected {expected}, current {current}")]
    VersionConflict { expected: u64, current: u64 },

    /// Conditional update lost against a concurrent writer.
    #[error("Assessment {0} changed concurrently")]
    StateConflict(AssessmentId),

    /// The requested assessment does not exist.
    #[error("Assessment not found: {0}")]
    AssessmentNotFound(AssessmentId),

    /// Persisted data violates an engine invariant.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BilanError {
    /// Classify this error for transport mapping.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            BilanError::InvalidStepIndex(_)
            | BilanError::InvalidPayloadShape(_)
            | BilanError::InvalidAnswer(_)
            | BilanError::InvalidIdentifier(_)
            | BilanError::UnknownPhase(_) => ErrorKind::Validation,
            BilanError::PhaseOutOfOrder { .. }
            | BilanError::PhaseAlreadyCompleted(_)
            | BilanError::InvalidTransition { .. }
            | BilanError::VersionConflict { .. }
            | BilanError::StateConflict(_) => ErrorKind::Conflict,
            BilanError::AssessmentNotFound(_) => ErrorKind::NotFound,
            BilanError::CorruptRecord(_)
            | BilanError::SerializationError(_)
            | BilanError::DeserializationError(_)
            | BilanError::IoError(_)
            | BilanError::ConfigError(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            BilanError::InvalidStepIndex(_) => "invalid_step_index",
            BilanError::InvalidPayloadShape(_) => "invalid_payload_shape",
            BilanError::InvalidAnswer(_) => "invalid_answer",
            BilanError::InvalidIdentifier(_) => "invalid_identifier",
            BilanError::UnknownPhase(_) => "unknown_phase",
            BilanError::PhaseOutOfOrder { .. } => "phase_out_of_order",
            BilanError::PhaseAlreadyCompleted(_) => "phase_already_completed",
            BilanError::InvalidTransition { .. } => "invalid_transition",
            BilanError::VersionConflict { .. } => "version_conflict",
            BilanError::StateConflict(_) => "state_conflict",
            BilanError::AssessmentNotFound(_) => "not_found",
            BilanError::CorruptRecord(_) => "corrupt_record",
            BilanError::SerializationError(_) => "serialization_error",
            BilanError::DeserializationError(_) => "deserialization_error",
            BilanError::IoError(_) => "io_error",
            BilanError::ConfigError(_) => "config_error",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
