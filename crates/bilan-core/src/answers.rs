//! # Answer Ledger Records
//!
//! Questionnaire answers recorded against an assessment. The ledger is the
//! source of phase progress; its `step_number` (1..=5) is unrelated to the
//! wizard draft's step slots.

use crate::primitives::{MAX_ANSWER_LENGTH, MAX_QUESTION_ID_LENGTH};
use crate::{AssessmentId, BilanError, QuestionId, Timestamp};
use serde::{Deserialize, Serialize};

/// One stored answer. Unique per `(assessment_id, question_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub assessment_id: AssessmentId,
    pub question_id: QuestionId,
    pub step_number: u8,
    pub answer_text: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A validated answer submission, ready to be upserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub assessment_id: AssessmentId,
    pub question_id: QuestionId,
    pub step_number: u8,
    pub answer_text: String,
}

impl AnswerSubmission {
    /// Validate raw answer input at the boundary.
    pub fn new(
        assessment_id: AssessmentId,
        question_id: &str,
        step_number: i64,
        answer_text: impl Into<String>,
    ) -> Result<Self, BilanError> {
        let step_number = u8::try_from(step_number)
            .ok()
            .filter(|n| (1..=5).contains(n))
            .ok_or_else(|| {
                BilanError::InvalidAnswer(format!("step number {step_number} outside 1..=5"))
            })?;

        let question_id = question_id.trim();
        if question_id.is_empty() {
            return Err(BilanError::InvalidAnswer("question id is empty".into()));
        }
        if question_id.len() > MAX_QUESTION_ID_LENGTH {
            return Err(BilanError::InvalidAnswer(format!(
                "question id longer than {MAX_QUESTION_ID_LENGTH} bytes"
            )));
        }

        let answer_text = answer_text.into();
        if answer_text.len() > MAX_ANSWER_LENGTH {
            return Err(BilanError::InvalidAnswer(format!(
                "answer text longer than {MAX_ANSWER_LENGTH} bytes"
            )));
        }

        Ok(Self {
            assessment_id,
            question_id: QuestionId::new(question_id),
            step_number,
            answer_text,
        })
    }

    /// Fold this submission into the existing answers of its assessment.
    ///
    /// Updates the answer with the same question id in place (keeping its
    /// `created_at`) or appends a new one. Returns the stored record.
    pub fn upsert_into(self, answers: &mut Vec<AnswerRecord>, now: Timestamp) -> AnswerRecord {
        if let Some(existing) = answers
            .iter_mut()
            .find(|a| a.question_id == self.question_id)
        {
            existing.step_number = self.step_number;
            existing.answer_text = self.answer_text;
            existing.updated_at = now;
            return existing.clone();
        }

        let record = AnswerRecord {
            assessment_id: self.assessment_id,
            question_id: self.question_id,
            step_number: self.step_number,
            answer_text: self.answer_text,
            created_at: now,
            updated_at: now,
        };
        answers.push(record.clone());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("timestamp")
    }

    fn id() -> AssessmentId {
        AssessmentId(Uuid::from_u128(7))
    }

    #[test]
    fn rejects_bad_step_numbers() {
        for step in [0, 6, -1, 300] {
            assert!(matches!(
                AnswerSubmission::new(id(), "q1", step, "yes"),
                Err(BilanError::InvalidAnswer(_))
            ));
        }
    }

    #[test]
    fn rejects_empty_question_and_long_text() {
        assert!(AnswerSubmission::new(id(), "  ", 1, "yes").is_err());
        let long = "x".repeat(MAX_ANSWER_LENGTH + 1);
        assert!(AnswerSubmission::new(id(), "q1", 1, long).is_err());
    }

    #[test]
    fn upsert_keeps_created_at() {
        let mut answers = Vec::new();
        AnswerSubmission::new(id(), "q1", 1, "first")
            .expect("valid")
            .upsert_into(&mut answers, at(1));
        let updated = AnswerSubmission::new(id(), "q1", 2, "second")
            .expect("valid")
            .upsert_into(&mut answers, at(5));

        assert_eq!(answers.len(), 1);
        assert_eq!(updated.created_at, at(1));
        assert_eq!(updated.updated_at, at(5));
        assert_eq!(updated.step_number, 2);
        assert_eq!(answers[0].answer_text, "second");
    }

    #[test]
    fn distinct_questions_append() {
        let mut answers = Vec::new();
        for q in ["q1", "q2", "q3"] {
            AnswerSubmission::new(id(), q, 1, "a")
                .expect("valid")
                .upsert_into(&mut answers, at(1));
        }
        assert_eq!(answers.len(), 3);
    }
}
