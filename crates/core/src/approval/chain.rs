//! Approver chain construction at expense creation.

use std::collections::HashSet;

use uuid::Uuid;

use crate::approval::types::{ApprovalRecord, ApprovalRule, ChainLink};

/// Stateless builder for the approver chain of a new expense.
pub struct ChainBuilder;

impl ChainBuilder {
    /// Computes the ordered approvers for a new expense.
    ///
    /// The manager comes first when there is no rule or the rule asks for the
    /// manager. Sequential and hybrid rules then contribute their steps in
    /// ascending `step_order`, renumbered after the manager. An approver who is
    /// already in the chain is skipped, so positions stay contiguous from 1.
    #[must_use]
    pub fn build(manager_id: Option<Uuid>, rule: Option<&ApprovalRule>) -> Vec<ChainLink> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next_order = 1u32;
        let mut push = |approver_id: Uuid| {
            if seen.insert(approver_id) {
                chain.push(ChainLink {
                    approver_id,
                    step_order: next_order,
                });
                next_order += 1;
            }
        };

        if rule.is_none_or(|r| r.is_manager_approver)
            && let Some(manager) = manager_id
        {
            push(manager);
        }

        if let Some(rule) = rule
            && rule.kind.uses_steps()
        {
            let mut steps = rule.steps.clone();
            steps.sort_by_key(|s| s.step_order);
            for step in steps {
                push(step.approver_id);
            }
        }

        chain
    }

    /// The expense's `current_step` right after creation.
    #[must_use]
    pub fn initial_step(chain: &[ChainLink]) -> Option<u32> {
        chain.first().map(|_| 1)
    }

    /// One pending ledger record per chain link.
    #[must_use]
    pub fn pending_records(chain: &[ChainLink]) -> Vec<ApprovalRecord> {
        chain.iter().copied().map(ApprovalRecord::pending).collect()
    }
}
