//! # Persistence Format
//!
//! Binary record encoding for assessments, answer lists and drafts.
//!
//! File and database I/O live in the storage adapters; this module is a
//! pure transformation between values and bytes.
//!
//! Format: Header (5 bytes) + payload.
//! - 4 bytes: Magic ("BILN")
//! - 1 byte: Version
//!
//! Assessments and answer lists use a `postcard` payload. Drafts hold
//! free-form JSON values and flattened extras, which `postcard` cannot
//! describe, so their payload is the JSON document.
//!
//! ## Validation
//!
//! - Maximum record size (`MAX_RECORD_SIZE`) is checked first
//! - Header is validated before the payload is parsed
//! - Decoded assessments must satisfy their invariants

use crate::answers::AnswerRecord;
use crate::assessment::Assessment;
use crate::draft::WizardDraft;
use crate::primitives::{self, MAX_RECORD_SIZE};
use crate::BilanError;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Size of the record header.
const HEADER_SIZE: usize = 5;

// =============================================================================
// RECORD HEADER
// =============================================================================

/// The header that precedes every persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), BilanError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(BilanError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(BilanError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BilanError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(BilanError::DeserializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// FRAMING
// =============================================================================

fn frame(payload: Vec<u8>) -> Result<Vec<u8>, BilanError> {
    let size = HEADER_SIZE.saturating_add(payload.len());
    if size > MAX_RECORD_SIZE {
        return Err(BilanError::SerializationError(format!(
            "Record size {size} bytes exceeds maximum allowed {MAX_RECORD_SIZE} bytes"
        )));
    }
    let mut record = Vec::with_capacity(size);
    record.extend_from_slice(&PersistenceHeader::new().to_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

/// Check size and header, and return the payload slice.
fn unframe(bytes: &[u8]) -> Result<&[u8], BilanError> {
    if bytes.len() > MAX_RECORD_SIZE {
        return Err(BilanError::DeserializationError(format!(
            "Record size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_RECORD_SIZE
        )));
    }
    PersistenceHeader::from_bytes(bytes)?.validate()?;
    Ok(&bytes[HEADER_SIZE..])
}

fn to_postcard<T: Serialize>(value: &T) -> Result<Vec<u8>, BilanError> {
    let payload =
        postcard::to_stdvec(value).map_err(|e| BilanError::SerializationError(e.to_string()))?;
    frame(payload)
}

fn from_postcard<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, BilanError> {
    let payload = unframe(bytes)?;
    postcard::from_bytes(payload).map_err(|e| {
        BilanError::DeserializationError(format!("Failed to deserialize {what}: {e}"))
    })
}

// =============================================================================
// RECORD CODECS
// =============================================================================

/// Encode an assessment record.
pub fn assessment_to_bytes(assessment: &Assessment) -> Result<Vec<u8>, BilanError> {
    to_postcard(assessment)
}

/// Decode an assessment record and check its invariants.
pub fn assessment_from_bytes(bytes: &[u8]) -> Result<Assessment, BilanError> {
    let assessment: Assessment = from_postcard(bytes, "assessment")?;
    assessment.validate()?;
    Ok(assessment)
}

/// Encode the answer list of one assessment.
pub fn answers_to_bytes(answers: &[AnswerRecord]) -> Result<Vec<u8>, BilanError> {
    to_postcard(&answers)
}

/// Decode the answer list of one assessment.
pub fn answers_from_bytes(bytes: &[u8]) -> Result<Vec<AnswerRecord>, BilanError> {
    from_postcard(bytes, "answer list")
}

/// Encode a draft as header + JSON document.
pub fn draft_to_bytes(draft: &WizardDraft) -> Result<Vec<u8>, BilanError> {
    let payload =
        serde_json::to_vec(draft).map_err(|e| BilanError::SerializationError(e.to_string()))?;
    frame(payload)
}

/// Decode a draft; step documents are shape-checked on the way in.
pub fn draft_from_bytes(bytes: &[u8]) -> Result<WizardDraft, BilanError> {
    let payload = unframe(bytes)?;
    serde_json::from_slice(payload)
        .map_err(|e| BilanError::DeserializationError(format!("Failed to deserialize draft: {e}")))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::merge_step;
    use crate::system::complete_phase;
    use crate::{AssessmentId, Phase, QuestionId, Timestamp, UserId};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("timestamp")
    }

    fn assessment() -> Assessment {
        Assessment::new(
            AssessmentId(Uuid::from_u128(1)),
            UserId(Uuid::from_u128(2)),
            Some(UserId(Uuid::from_u128(3))),
            at(0),
        )
    }

    #[test]
    fn header_roundtrip() {
        let header = PersistenceHeader::new();
        let restored = PersistenceHeader::from_bytes(&header.to_bytes()).expect("parse header");
        assert_eq!(restored, header);
        assert_eq!(&restored.magic, primitives::MAGIC_BYTES);
    }

    #[test]
    fn assessment_bytes_stable() {
        let assessment =
            complete_phase(&assessment(), Phase::Preliminary, at(10)).expect("complete");
        let bytes1 = assessment_to_bytes(&assessment).expect("encode");
        let restored = assessment_from_bytes(&bytes1).expect("decode");
        assert_eq!(restored, assessment);
        assert_eq!(assessment_to_bytes(&restored).expect("encode"), bytes1);
    }

    #[test]
    fn corrupt_assessment_rejected() {
        let mut broken = assessment();
        broken.overall_status = crate::OverallStatus::Completed;
        let bytes = assessment_to_bytes(&broken).expect("encode");
        assert!(matches!(
            assessment_from_bytes(&bytes),
            Err(BilanError::CorruptRecord(_))
        ));
    }

    #[test]
    fn answers_roundtrip() {
        let answers = vec![AnswerRecord {
            assessment_id: AssessmentId(Uuid::from_u128(1)),
            question_id: QuestionId::new("q1"),
            step_number: 2,
            answer_text: "oui".into(),
            created_at: at(1),
            updated_at: at(2),
        }];
        let bytes = answers_to_bytes(&answers).expect("encode");
        assert_eq!(answers_from_bytes(&bytes).expect("decode"), answers);
    }

    #[test]
    fn draft_roundtrip_keeps_extras() {
        let draft = merge_step(
            &WizardDraft::new(),
            2,
            &json!({"skills": ["rust"], "custom": {"nested": [1, 2]}}),
        )
        .expect("merge");
        let bytes = draft_to_bytes(&draft).expect("encode");
        assert_eq!(&bytes[0..4], b"BILN");
        assert_eq!(draft_from_bytes(&bytes).expect("decode"), draft);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(assessment_from_bytes(&bytes).is_err());
        assert!(draft_from_bytes(&bytes).is_err());
    }

    #[test]
    fn short_record_rejected() {
        assert!(answers_from_bytes(b"BIL").is_err());
    }
}
