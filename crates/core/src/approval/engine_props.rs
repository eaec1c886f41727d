//! Property-based tests for DecisionEngine.

use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

use crate::approval::engine::{ActionRequest, DecisionEngine};
use crate::approval::error::ApprovalError;
use crate::approval::types::{
    Action, ApprovalRecord, ApprovalStatus, ChainLink, Decision, ExpenseState, ExpenseStatus,
    RuleKind,
};

/// Strategy for generating random UUIDs.
fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for generating optional rule kinds.
fn arb_kind() -> impl Strategy<Value = Option<RuleKind>> {
    prop_oneof![
        Just(None),
        Just(Some(RuleKind::Sequential)),
        (1u8..=100).prop_map(|threshold| Some(RuleKind::Percentage { threshold })),
        arb_uuid().prop_map(|approver_id| Some(RuleKind::SpecificApprover { approver_id })),
        ((1u8..=100), arb_uuid()).prop_map(|(threshold, approver_id)| Some(RuleKind::Hybrid {
            threshold,
            approver_id
        })),
    ]
}

/// Strategy for generating non-empty comments.
fn arb_comment() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 ]{0,40}"
}

fn ledger(size: usize) -> Vec<ApprovalRecord> {
    (1u32..)
        .take(size)
        .map(|step_order| {
            ApprovalRecord::pending(ChainLink {
                approver_id: Uuid::new_v4(),
                step_order,
            })
        })
        .collect()
}

fn pending(current_step: Option<u32>) -> ExpenseState {
    ExpenseState {
        id: Uuid::new_v4(),
        status: ExpenseStatus::Pending,
        current_step,
    }
}

fn request(approver_id: Uuid, action: Action, comment: Option<&str>) -> ActionRequest<'_> {
    ActionRequest {
        approver_id,
        action,
        comment,
        at: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A reject with a comment finalizes the expense under every rule kind.
    #[test]
    fn prop_reject_is_absolute(
        kind in arb_kind(),
        size in 1usize..8,
        actor in any::<prop::sample::Index>(),
        comment in arb_comment(),
    ) {
        let records = ledger(size);
        let actor = records[actor.index(size)].approver_id;

        let outcome = DecisionEngine::decide(
            &pending(Some(1)),
            kind.as_ref(),
            &records,
            &request(actor, Action::Reject, Some(&comment)),
        ).unwrap();

        prop_assert_eq!(outcome.decision, Decision::Rejected);
        prop_assert_eq!(outcome.expense.status, ExpenseStatus::Rejected);
        prop_assert_eq!(outcome.record.status, ApprovalStatus::Rejected);
    }

    /// Once final, no action by anyone changes the expense.
    #[test]
    fn prop_terminal_states_are_final(
        kind in arb_kind(),
        terminal in prop_oneof![Just(ExpenseStatus::Approved), Just(ExpenseStatus::Rejected)],
        size in 0usize..6,
        reject in any::<bool>(),
        actor in arb_uuid(),
    ) {
        let records = ledger(size);
        let expense = ExpenseState { status: terminal, ..pending(None) };
        let action = if reject { Action::Reject } else { Action::Approve };
        let actor = records.first().map_or(actor, |r| r.approver_id);

        let result = DecisionEngine::decide(
            &expense,
            kind.as_ref(),
            &records,
            &request(actor, action, Some("because")),
        );
        let blocked = matches!(
            &result,
            Err(ApprovalError::ExpenseNotPending { status }) if *status == terminal
        );
        prop_assert!(blocked, "terminal expense accepted an action: {:?}", result);
    }

    /// The k-th approval finalizes exactly when k * 100 >= threshold * n.
    #[test]
    fn prop_threshold_boundary(
        size in 1usize..20,
        threshold in 1u8..=100,
        k in any::<prop::sample::Index>(),
    ) {
        let k = k.index(size) + 1;
        let n = u32::try_from(size).unwrap();
        let before = u32::try_from(k - 1).unwrap();
        prop_assume!(!DecisionEngine::meets_threshold(before, n, threshold));

        let mut records = ledger(size);
        for record in records.iter_mut().take(k - 1) {
            record.status = ApprovalStatus::Approved;
        }
        let kind = RuleKind::Percentage { threshold };

        let outcome = DecisionEngine::decide(
            &pending(Some(1)),
            Some(&kind),
            &records,
            &request(records[k - 1].approver_id, Action::Approve, None),
        ).unwrap();

        let after = before + 1;
        let expected = u64::from(after) * 100 >= u64::from(threshold) * u64::from(n);
        prop_assert_eq!(outcome.expense.status == ExpenseStatus::Approved, expected);
    }

    /// Under a specific-approver rule, chain approvals alone never finalize.
    #[test]
    fn prop_only_specific_approver_finalizes(
        size in 1usize..6,
        rotation in 0usize..6,
        signer in arb_uuid(),
    ) {
        let kind = RuleKind::SpecificApprover { approver_id: signer };
        let mut records = ledger(size);
        let mut expense = pending(Some(1));

        let mut indices: Vec<usize> = (0..size).collect();
        indices.rotate_left(rotation % size);

        for i in indices {
            let outcome = DecisionEngine::decide(
                &expense,
                Some(&kind),
                &records,
                &request(records[i].approver_id, Action::Approve, None),
            ).unwrap();
            prop_assert_eq!(outcome.expense.status, ExpenseStatus::Pending);
            records[i] = outcome.record;
            expense = outcome.expense;
        }

        let outcome = DecisionEngine::decide(
            &expense,
            Some(&kind),
            &records,
            &request(signer, Action::Approve, None),
        ).unwrap();
        prop_assert_eq!(outcome.decision, Decision::SpecificApprover);
        prop_assert_eq!(outcome.record.step_order, u32::try_from(size).unwrap() + 1);
    }

    /// After any approval the current step is the lowest pending step.
    #[test]
    fn prop_current_step_tracks_lowest_pending(
        size in 2usize..8,
        actor in any::<prop::sample::Index>(),
    ) {
        let records = ledger(size);
        let index = actor.index(size);

        let outcome = DecisionEngine::decide(
            &pending(Some(1)),
            Some(&RuleKind::Sequential),
            &records,
            &request(records[index].approver_id, Action::Approve, None),
        ).unwrap();

        let expected = if index == 0 { 2 } else { 1 };
        prop_assert_eq!(outcome.expense.current_step, Some(expected));
        prop_assert_eq!(outcome.expense.status, ExpenseStatus::Pending);
    }
}
