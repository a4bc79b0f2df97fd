//! # Progression Tier Tests (T0-T3)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Draft Merge Integrity
//! - T1: Completion Statistics
//! - T2: Phase Gate Ordering
//! - T3: End-to-End Progression (both storage backends)

use bilan_core::{
    AssessmentId, BilanError, OverallStatus, Phase, ProgressionService, StepIndex, Timestamp,
    UserId, WizardDraft, compute_phase_progress, compute_step_completion, current_step, merge_step,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

fn at(secs: i64) -> Timestamp {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("timestamp")
}

fn step(n: i64) -> StepIndex {
    StepIndex::new(n).expect("valid step")
}

// =============================================================================
// TIER T0: DRAFT MERGE INTEGRITY
// =============================================================================

mod t0_draft_merge {
    use super::*;

    /// T0.1: A payload touching one field never erases its siblings.
    #[test]
    fn sibling_fields_survive() {
        let draft = merge_step(
            &WizardDraft::new(),
            2,
            &json!({"skills": ["welding"], "experiences": [{"years": 4}]}),
        )
        .expect("merge");
        let draft = merge_step(&draft, 2, &json!({"skills": ["welding", "cad"]})).expect("merge");

        let fields = draft.step(step(2)).expect("step 2").to_fields().expect("fields");
        assert_eq!(fields["skills"], json!(["welding", "cad"]));
        assert_eq!(fields["experiences"], json!([{"years": 4}]));
    }

    /// T0.2: Unknown keys pass through unmodified.
    #[test]
    fn unknown_keys_pass_through() {
        let payload = json!({"free_notes": {"mood": "good", "tags": [1, 2, 3]}});
        let draft = merge_step(&WizardDraft::new(), 4, &payload).expect("merge");
        let fields = draft.step(step(4)).expect("step 4").to_fields().expect("fields");
        assert_eq!(fields["free_notes"], payload["free_notes"]);
    }

    /// T0.3: Named fields are shape-checked.
    #[test]
    fn wrong_shape_rejected() {
        let draft = WizardDraft::new();
        for (n, payload) in [
            (1, json!({"personal_info": "not an object"})),
            (2, json!({"skills": "not a list"})),
            (3, json!({"competencies": [{"level": "high"}]})),
            (4, json!({"personality": [1, 2]})),
            (5, json!({"action_plan": 12})),
        ] {
            assert!(
                matches!(
                    merge_step(&draft, n, &payload),
                    Err(BilanError::InvalidPayloadShape(_))
                ),
                "step {n} accepted {payload}"
            );
        }
    }

    /// T0.4: Re-applying the same payload changes nothing.
    #[test]
    fn merge_idempotent() {
        let payload = json!({"action_plan": {"goal": "retrain"}});
        let once = merge_step(&WizardDraft::new(), 5, &payload).expect("merge");
        let twice = merge_step(&once, 5, &payload).expect("merge");
        assert_eq!(once, twice);
    }
}

// =============================================================================
// TIER T1: COMPLETION STATISTICS
// =============================================================================

mod t1_completion {
    use super::*;

    /// T1.1: Completion counts non-empty steps only.
    #[test]
    fn completion_counts_non_empty_steps() {
        let draft = merge_step(&WizardDraft::new(), 3, &json!({})).expect("merge");
        let draft = merge_step(&draft, 5, &json!({"action_plan": {}})).expect("merge");

        let completion = compute_step_completion(&draft);
        assert_eq!(completion.completed_steps, 1);
        assert_eq!(completion.completed, vec![step(5)]);
        assert_eq!(current_step(&draft), 1);
    }

    /// T1.2: Phase progress ignores answers of other phases.
    #[test]
    fn phase_progress_is_scoped() {
        let mut service = ProgressionService::new();
        let id = AssessmentId(Uuid::from_u128(1));
        service
            .create_assessment(id, UserId(Uuid::from_u128(2)), None, at(0))
            .expect("create");
        for i in 0..4 {
            service
                .record_answer(id, &format!("inv-{i}"), 3, "x", at(i))
                .expect("answer");
        }
        let answers = service.answers(id).expect("answers");
        assert_eq!(compute_phase_progress(&answers, Phase::Preliminary), 0);
        assert_eq!(compute_phase_progress(&answers, Phase::Investigation), 67);
    }
}

// =============================================================================
// TIER T2: PHASE GATE ORDERING
// =============================================================================

mod t2_phase_gate {
    use super::*;

    fn service() -> (ProgressionService, AssessmentId) {
        let mut service = ProgressionService::new();
        let id = AssessmentId(Uuid::from_u128(7));
        service
            .create_assessment(
                id,
                UserId(Uuid::from_u128(8)),
                Some(UserId(Uuid::from_u128(9))),
                at(0),
            )
            .expect("create");
        (service, id)
    }

    /// T2.1: Out-of-order completion is rejected and mutates nothing.
    #[test]
    fn out_of_order_rejected_without_mutation() {
        let (mut service, id) = service();
        let before = service.assessment(id).expect("load");
        assert!(matches!(
            service.complete_phase(id, Phase::Conclusion, at(1)),
            Err(BilanError::PhaseOutOfOrder {
                requested: Phase::Conclusion,
                current: Phase::Preliminary
            })
        ));
        assert_eq!(service.assessment(id).expect("load"), before);
    }

    /// T2.2: A repeated completion fails and keeps the first timestamp.
    #[test]
    fn duplicate_completion_keeps_timestamp() {
        let (mut service, id) = service();
        service
            .complete_phase(id, Phase::Preliminary, at(1))
            .expect("complete");
        service
            .complete_phase(id, Phase::Investigation, at(2))
            .expect("complete");
        assert!(matches!(
            service.complete_phase(id, Phase::Investigation, at(3)),
            Err(BilanError::PhaseAlreadyCompleted(Phase::Investigation))
        ));
        let stored = service.assessment(id).expect("load");
        assert_eq!(
            stored.phase_completion.investigation.completed_at,
            Some(at(2))
        );
    }

    /// T2.3: The gate does not consult progress.
    #[test]
    fn gate_ignores_progress() {
        let (mut service, id) = service();
        let view = service.parcours(id).expect("parcours");
        assert_eq!(view.phases[0].progress, 0);
        service
            .complete_phase(id, Phase::Preliminary, at(1))
            .expect("complete with zero answers");
    }

    /// T2.4: CONCLUSION completes the assessment.
    #[test]
    fn conclusion_sets_completed() {
        let (mut service, id) = service();
        for (i, phase) in Phase::ALL.into_iter().enumerate() {
            service
                .complete_phase(id, phase, at(i as i64 + 1))
                .expect("complete");
        }
        let stored = service.assessment(id).expect("load");
        assert_eq!(stored.overall_status, OverallStatus::Completed);
        assert_eq!(stored.completed_at, Some(at(3)));
        assert!(matches!(
            service.complete_phase(id, Phase::Conclusion, at(9)),
            Err(BilanError::PhaseAlreadyCompleted(Phase::Conclusion))
        ));
    }
}

// =============================================================================
// TIER T3: END-TO-END PROGRESSION
// =============================================================================

mod t3_end_to_end {
    use super::*;

    /// The walkthrough from a fresh assessment to INVESTIGATION.
    fn walkthrough(mut service: ProgressionService) {
        let id = AssessmentId(Uuid::from_u128(100));
        service
            .create_assessment(id, UserId(Uuid::from_u128(101)), None, at(0))
            .expect("create");

        service
            .save_step(id, 1, &json!({"personal_info": {"name": "X"}}), None, at(1))
            .expect("save");
        let progress = service.draft_progress(id).expect("progress");
        assert_eq!(progress.completion.completed_steps, 1);
        assert_eq!(progress.completion.percentage, 20);
        assert_eq!(
            progress.completion.missing,
            vec![step(2), step(3), step(4), step(5)]
        );
        assert_eq!(progress.current_step, 2);

        for (i, step_number) in [1, 2, 1, 2, 1, 2].into_iter().enumerate() {
            service
                .record_answer(id, &format!("q{i}"), step_number, "answer", at(10 + i as i64))
                .expect("answer");
        }
        let view = service.parcours(id).expect("parcours");
        assert_eq!(view.phases[0].progress, 100);

        service
            .complete_phase(id, Phase::Preliminary, at(20))
            .expect("complete");
        let view = service.parcours(id).expect("parcours");
        assert_eq!(view.current_phase, Some(Phase::Investigation));

        // Zero investigation answers does not block completion.
        let updated = service
            .complete_phase(id, Phase::Investigation, at(21))
            .expect("complete");
        assert_eq!(updated.overall_status, OverallStatus::Conclusion);
    }

    /// T3.1: In-memory backend.
    #[test]
    fn walkthrough_in_memory() {
        walkthrough(ProgressionService::new());
    }

    /// T3.2: redb backend.
    #[test]
    fn walkthrough_redb() {
        let temp = tempfile::tempdir().expect("temp dir");
        let service =
            ProgressionService::with_redb(temp.path().join("bilan.redb")).expect("open db");
        assert!(service.is_persistent());
        walkthrough(service);
    }

    /// T3.3: Export redacts contact fields but keeps them in storage.
    #[test]
    fn export_redacts() {
        let mut service = ProgressionService::new();
        let id = AssessmentId(Uuid::from_u128(5));
        service
            .create_assessment(id, UserId(Uuid::from_u128(6)), None, at(0))
            .expect("create");
        service
            .save_step(
                id,
                1,
                &json!({"personal_info": {"email": "x@y.fr", "address": {"city": "Lyon"}}}),
                None,
                at(1),
            )
            .expect("save");

        let export = service.export(id, false, at(2)).expect("export");
        let exported = serde_json::to_value(&export.draft).expect("serialize");
        assert_eq!(
            exported["steps"]["step1"]["personal_info"]["email"],
            json!("[REDACTED]")
        );
        assert_eq!(
            exported["steps"]["step1"]["personal_info"]["address"],
            json!("[REDACTED]")
        );

        let stored = serde_json::to_value(service.draft(id).expect("draft")).expect("serialize");
        assert_eq!(
            stored["steps"]["step1"]["personal_info"]["email"],
            json!("x@y.fr")
        );
    }
}
