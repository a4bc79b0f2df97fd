//! # redb-backed Storage
//!
//! A disk-backed store using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Every record is keyed by the assessment id's 128-bit value and stored
//! as a framed blob (see [`crate::formats`]). Conditional updates read,
//! compare and write inside one write transaction.

use super::{
    AnswerLedger, AssessmentStore, DraftSave, conditional_archive, conditional_complete,
    sort_answers, stamp_draft,
};
use crate::answers::{AnswerRecord, AnswerSubmission};
use crate::assessment::{Assessment, PhaseCompletion};
use crate::draft::WizardDraft;
use crate::formats::{
    answers_from_bytes, answers_to_bytes, assessment_from_bytes, assessment_to_bytes,
    draft_from_bytes, draft_to_bytes,
};
use crate::{AssessmentId, BilanError, OverallStatus, Phase, Timestamp};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;

/// Assessment rows: id -> framed postcard `Assessment`.
const ASSESSMENTS: TableDefinition<u128, &[u8]> = TableDefinition::new("assessments");

/// Wizard drafts: id -> framed JSON `WizardDraft`.
const DRAFTS: TableDefinition<u128, &[u8]> = TableDefinition::new("drafts");

/// Answer ledger: id -> framed postcard `Vec<AnswerRecord>`.
const ANSWERS: TableDefinition<u128, &[u8]> = TableDefinition::new("answers");

fn io_error(e: impl std::fmt::Display) -> BilanError {
    BilanError::IoError(e.to_string())
}

/// A disk-backed assessment store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BilanError> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_error)?;
            let _ = write_txn.open_table(ASSESSMENTS).map_err(io_error)?;
            let _ = write_txn.open_table(DRAFTS).map_err(io_error)?;
            let _ = write_txn.open_table(ANSWERS).map_err(io_error)?;
            write_txn.commit().map_err(io_error)?;
        }

        Ok(Self { db })
    }

    /// Read one blob from a table in a fresh read transaction.
    fn read_blob(
        &self,
        table: TableDefinition<u128, &[u8]>,
        id: AssessmentId,
    ) -> Result<Option<Vec<u8>>, BilanError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(table).map_err(io_error)?;
        let blob = table
            .get(id.as_u128())
            .map_err(io_error)?
            .map(|guard| guard.value().to_vec());
        Ok(blob)
    }

    /// Load the stored assessment inside a write transaction.
    fn stored_in(txn: &WriteTransaction, id: AssessmentId) -> Result<Assessment, BilanError> {
        let table = txn.open_table(ASSESSMENTS).map_err(io_error)?;
        let blob = table
            .get(id.as_u128())
            .map_err(io_error)?
            .map(|guard| guard.value().to_vec());
        match blob {
            Some(bytes) => assessment_from_bytes(&bytes),
            None => Err(BilanError::AssessmentNotFound(id)),
        }
    }

    /// Overwrite an assessment row inside a write transaction.
    fn put_assessment(txn: &WriteTransaction, assessment: &Assessment) -> Result<(), BilanError> {
        let bytes = assessment_to_bytes(assessment)?;
        let mut table = txn.open_table(ASSESSMENTS).map_err(io_error)?;
        table
            .insert(assessment.id.as_u128(), bytes.as_slice())
            .map_err(io_error)?;
        Ok(())
    }

    /// Run a conditional assessment update in one write transaction.
    fn update_assessment(
        &mut self,
        id: AssessmentId,
        apply: impl FnOnce(&Assessment) -> Result<Assessment, BilanError>,
    ) -> Result<Assessment, BilanError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        let stored = Self::stored_in(&write_txn, id)?;
        let next = apply(&stored)?;
        Self::put_assessment(&write_txn, &next)?;
        write_txn.commit().map_err(io_error)?;
        Ok(next)
    }
}

impl AssessmentStore for RedbStore {
    fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>, BilanError> {
        self.read_blob(ASSESSMENTS, id)?
            .map(|bytes| assessment_from_bytes(&bytes))
            .transpose()
    }

    fn insert_assessment(&mut self, assessment: &Assessment) -> Result<(), BilanError> {
        assessment.validate()?;
        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let table = write_txn.open_table(ASSESSMENTS).map_err(io_error)?;
            let exists = table
                .get(assessment.id.as_u128())
                .map_err(io_error)?
                .is_some();
            if exists {
                return Err(BilanError::StateConflict(assessment.id));
            }
        }
        Self::put_assessment(&write_txn, assessment)?;
        write_txn.commit().map_err(io_error)?;
        Ok(())
    }

    fn list_assessments(&self) -> Result<Vec<Assessment>, BilanError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(ASSESSMENTS).map_err(io_error)?;
        let mut assessments = Vec::new();
        for entry in table.iter().map_err(io_error)? {
            let (_, value) = entry.map_err(io_error)?;
            assessments.push(assessment_from_bytes(value.value())?);
        }
        Ok(assessments)
    }

    fn get_draft(&self, id: AssessmentId) -> Result<Option<WizardDraft>, BilanError> {
        self.read_blob(DRAFTS, id)?
            .map(|bytes| draft_from_bytes(&bytes))
            .transpose()
    }

    fn save_draft(
        &mut self,
        id: AssessmentId,
        draft: &WizardDraft,
        expected_version: u64,
        now: Timestamp,
    ) -> Result<DraftSave, BilanError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        Self::stored_in(&write_txn, id)?;

        let outcome = {
            let mut table = write_txn.open_table(DRAFTS).map_err(io_error)?;
            let stored = table
                .get(id.as_u128())
                .map_err(io_error)?
                .map(|guard| guard.value().to_vec());
            let stored_version = match stored {
                Some(bytes) => draft_from_bytes(&bytes)?.version(),
                None => 0,
            };

            let outcome = stamp_draft(draft, stored_version, expected_version, now);
            if let DraftSave::Saved(saved) = &outcome {
                let bytes = draft_to_bytes(saved)?;
                table
                    .insert(id.as_u128(), bytes.as_slice())
                    .map_err(io_error)?;
            }
            outcome
        };

        write_txn.commit().map_err(io_error)?;
        Ok(outcome)
    }

    fn update_phase_completion(
        &mut self,
        id: AssessmentId,
        phase: Phase,
        expected_prior: &PhaseCompletion,
        now: Timestamp,
    ) -> Result<Assessment, BilanError> {
        self.update_assessment(id, |stored| {
            conditional_complete(stored, phase, expected_prior, now)
        })
    }

    fn archive_assessment(
        &mut self,
        id: AssessmentId,
        expected_prior_status: OverallStatus,
        now: Timestamp,
    ) -> Result<Assessment, BilanError> {
        self.update_assessment(id, |stored| {
            conditional_archive(stored, expected_prior_status, now)
        })
    }
}

impl AnswerLedger for RedbStore {
    fn list_answers(&self, id: AssessmentId) -> Result<Vec<AnswerRecord>, BilanError> {
        let mut answers = match self.read_blob(ANSWERS, id)? {
            Some(bytes) => answers_from_bytes(&bytes)?,
            None => Vec::new(),
        };
        sort_answers(&mut answers);
        Ok(answers)
    }

    fn record_answer(
        &mut self,
        submission: AnswerSubmission,
        now: Timestamp,
    ) -> Result<AnswerRecord, BilanError> {
        let id = submission.assessment_id;
        let write_txn = self.db.begin_write().map_err(io_error)?;
        Self::stored_in(&write_txn, id)?;

        let record = {
            let mut table = write_txn.open_table(ANSWERS).map_err(io_error)?;
            let stored = table
                .get(id.as_u128())
                .map_err(io_error)?
                .map(|guard| guard.value().to_vec());
            let mut answers = match stored {
                Some(bytes) => answers_from_bytes(&bytes)?,
                None => Vec::new(),
            };

            let record = submission.upsert_into(&mut answers, now);
            let bytes = answers_to_bytes(&answers)?;
            table
                .insert(id.as_u128(), bytes.as_slice())
                .map_err(io_error)?;
            record
        };

        write_txn.commit().map_err(io_error)?;
        Ok(record)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::draft::merge_step;
    use crate::UserId;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("timestamp")
    }

    fn assessment(n: u128) -> Assessment {
        Assessment::new(
            AssessmentId(Uuid::from_u128(n)),
            UserId(Uuid::from_u128(100)),
            None,
            at(0),
        )
    }

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        store.insert_assessment(&assessment(1)).expect("insert");
        store.insert_assessment(&assessment(2)).expect("insert");
        assert_eq!(store.list_assessments().expect("list").len(), 2);
        assert!(matches!(
            store.insert_assessment(&assessment(1)),
            Err(BilanError::StateConflict(_))
        ));
        assert!(
            store
                .get_assessment(AssessmentId(Uuid::from_u128(3)))
                .expect("get")
                .is_none()
        );
    }

    #[test]
    fn data_survives_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let id = AssessmentId(Uuid::from_u128(1));

        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store.insert_assessment(&assessment(1)).expect("insert");
            let draft = merge_step(&WizardDraft::new(), 1, &json!({"career_goals": "nurse"}))
                .expect("merge");
            store.save_draft(id, &draft, 0, at(1)).expect("save");
            store
                .update_phase_completion(id, Phase::Preliminary, &PhaseCompletion::default(), at(2))
                .expect("complete");
            let submission = AnswerSubmission::new(id, "q1", 1, "yes").expect("valid");
            store.record_answer(submission, at(3)).expect("answer");
        }

        let store = RedbStore::open(&db_path).expect("reopen db");
        let stored = store.get_assessment(id).expect("get").expect("exists");
        assert_eq!(stored.overall_status, OverallStatus::Investigation);
        let draft = store.get_draft(id).expect("get").expect("exists");
        assert_eq!(draft.version(), 1);
        assert_eq!(draft.updated_at(), Some(at(1)));
        assert_eq!(store.list_answers(id).expect("list").len(), 1);
    }

    #[test]
    fn stale_draft_version_conflicts() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let id = AssessmentId(Uuid::from_u128(1));
        store.insert_assessment(&assessment(1)).expect("insert");

        store.save_draft(id, &WizardDraft::new(), 0, at(1)).expect("save");
        let outcome = store.save_draft(id, &WizardDraft::new(), 0, at(2)).expect("save");
        assert_eq!(outcome, DraftSave::Conflict { current_version: 1 });
    }

    #[test]
    fn conditional_completion_rejects_stale_prior() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let id = AssessmentId(Uuid::from_u128(1));
        store.insert_assessment(&assessment(1)).expect("insert");

        let prior = PhaseCompletion::default();
        store
            .update_phase_completion(id, Phase::Preliminary, &prior, at(1))
            .expect("complete");
        assert!(matches!(
            store.update_phase_completion(id, Phase::Preliminary, &prior, at(2)),
            Err(BilanError::StateConflict(_))
        ));
    }

    #[test]
    fn archive_requires_expected_status() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let id = AssessmentId(Uuid::from_u128(1));
        store.insert_assessment(&assessment(1)).expect("insert");

        assert!(matches!(
            store.archive_assessment(id, OverallStatus::Completed, at(1)),
            Err(BilanError::StateConflict(_))
        ));
        assert!(matches!(
            store.archive_assessment(id, OverallStatus::Preliminary, at(1)),
            Err(BilanError::InvalidTransition { .. })
        ));
    }
}
