//! Property-based tests for ChainBuilder.

use proptest::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

use crate::approval::chain::ChainBuilder;
use crate::approval::types::{ApprovalRule, ApprovalStep, RuleKind};

/// Strategy for generating random UUIDs.
fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for generating rule kinds.
fn arb_kind() -> impl Strategy<Value = RuleKind> {
    prop_oneof![
        Just(RuleKind::Sequential),
        (1u8..=100).prop_map(|threshold| RuleKind::Percentage { threshold }),
        arb_uuid().prop_map(|approver_id| RuleKind::SpecificApprover { approver_id }),
        ((1u8..=100), arb_uuid())
            .prop_map(|(threshold, approver_id)| RuleKind::Hybrid { threshold, approver_id }),
    ]
}

/// Strategy for a rule whose steps draw from a small pool, so repeats happen.
fn arb_rule(pool: Vec<Uuid>) -> impl Strategy<Value = ApprovalRule> {
    (
        arb_kind(),
        any::<bool>(),
        prop::collection::vec(prop::sample::select(pool), 0..8),
    )
        .prop_map(|(kind, is_manager_approver, approvers)| ApprovalRule {
            id: Uuid::nil(),
            company_id: Uuid::nil(),
            name: "Generated".to_string(),
            is_active: true,
            is_manager_approver,
            kind,
            steps: approvers
                .into_iter()
                .zip(1u32..)
                .map(|(approver_id, step_order)| ApprovalStep {
                    step_order,
                    approver_id,
                })
                .collect(),
        })
}

fn pool() -> Vec<Uuid> {
    (1u128..=6).map(Uuid::from_u128).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Step orders are exactly 1..=n and every approver appears once.
    #[test]
    fn prop_chain_is_contiguous_and_unique(
        manager in prop::option::of(prop::sample::select(pool())),
        rule in prop::option::of(arb_rule(pool())),
    ) {
        let chain = ChainBuilder::build(manager, rule.as_ref());

        let orders: Vec<u32> = chain.iter().map(|l| l.step_order).collect();
        let expected: Vec<u32> = (1..=u32::try_from(chain.len()).unwrap()).collect();
        prop_assert_eq!(orders, expected);

        let unique: HashSet<Uuid> = chain.iter().map(|l| l.approver_id).collect();
        prop_assert_eq!(unique.len(), chain.len());
        prop_assert_eq!(ChainBuilder::initial_step(&chain), chain.first().map(|_| 1));
    }

    /// The manager leads the chain whenever they are included.
    #[test]
    fn prop_manager_leads_when_included(
        manager in arb_uuid(),
        rule in prop::option::of(arb_rule(pool())),
    ) {
        let chain = ChainBuilder::build(Some(manager), rule.as_ref());
        let included = rule.as_ref().is_none_or(|r| r.is_manager_approver);

        if included {
            prop_assert_eq!(chain.first().map(|l| l.approver_id), Some(manager));
        } else {
            prop_assert!(chain.iter().all(|l| l.approver_id != manager));
        }
    }

    /// Percentage and specific-approver rules never contribute steps.
    #[test]
    fn prop_stepless_kinds_add_only_manager(
        manager in prop::option::of(arb_uuid()),
        rule in arb_rule(pool()),
    ) {
        let chain = ChainBuilder::build(manager, Some(&rule));
        if !rule.kind.uses_steps() {
            prop_assert!(chain.len() <= 1);
            if let Some(link) = chain.first() {
                prop_assert_eq!(Some(link.approver_id), manager);
            }
        }
    }
}
