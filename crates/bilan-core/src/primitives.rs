//! # Engine Primitives
//!
//! Hardcoded constants of the progression engine.
//!
//! These values are compiled into the binary and are immutable at runtime.
//!
//! ## Primitives
//!
//! 1. **Wizard shape**: five fixed semantic step slots.
//! 2. **Answer expectations**: how many ledger answers fill each phase bar.
//! 3. **Redaction**: which contact fields are masked on export.
//! 4. **Input limits**: bounds enforced at the boundary.

/// Number of wizard step slots in a draft.
pub const TOTAL_STEPS: u8 = 5;

/// Expected ledger answers for the PRELIMINARY phase (answer steps 1 and 2).
pub const PRELIMINARY_EXPECTED_ANSWERS: usize = 6;

/// Expected ledger answers for the INVESTIGATION phase (answer steps 3 and 4).
pub const INVESTIGATION_EXPECTED_ANSWERS: usize = 6;

/// Expected ledger answers for the CONCLUSION phase (answer step 5).
pub const CONCLUSION_EXPECTED_ANSWERS: usize = 3;

/// Marker written in place of redacted contact identifiers.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Contact identifiers inside step 1 `personal_info` masked by redaction.
pub const SENSITIVE_PERSONAL_FIELDS: [&str; 3] = ["email", "phone", "address"];

/// Magic bytes for the Bilan binary record header.
pub const MAGIC_BYTES: &[u8; 4] = b"BILN";

/// Current record format version.
///
/// Increment this when making breaking changes to the record format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of top-level keys in one partial step payload.
pub const MAX_PAYLOAD_KEYS: usize = 128;

/// Maximum length of a payload key.
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum length of a question id.
pub const MAX_QUESTION_ID_LENGTH: usize = 256;

/// Maximum length of an answer text (64KB).
pub const MAX_ANSWER_LENGTH: usize = 65536;

/// Maximum size of a single persisted record (16 MB).
///
/// Validated BEFORE attempting deserialization.
pub const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// Round `numerator / denominator * 100` half up, in integer arithmetic.
///
/// Returns 0 when `denominator` is 0.
#[must_use]
pub fn rounded_percent(numerator: usize, denominator: usize) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let scaled = (numerator as u64).saturating_mul(100);
    let denominator = denominator as u64;
    scaled.saturating_add(denominator / 2) / denominator
}
