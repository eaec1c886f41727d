//! Approval rule validation.

use std::collections::HashSet;

use serde::Deserialize;
use uuid::Uuid;

use crate::approval::error::ApprovalError;
use crate::approval::types::{ApprovalStep, RuleKind, RuleType};

/// Rule as submitted by an administrator, before validation.
///
/// Missing fields deserialize to their defaults so that validation, not the
/// decoder, reports them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleDraft {
    /// Display name.
    pub rule_name: String,
    /// One of `sequential`, `percentage`, `specific_approver`, `hybrid`.
    pub rule_type: String,
    /// Defaults to true when omitted.
    pub is_manager_approver: Option<bool>,
    /// Required for percentage and hybrid rules.
    pub percentage_threshold: Option<i32>,
    /// Required for specific-approver and hybrid rules.
    pub specific_approver_id: Option<Uuid>,
    /// Ordered approvers, kept only for sequential and hybrid rules.
    pub approvers: Vec<Uuid>,
}

/// A rule that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRule {
    /// Trimmed display name.
    pub name: String,
    /// Put the submitter's manager first in the chain.
    pub is_manager_approver: bool,
    /// Resolution strategy.
    pub kind: RuleKind,
    /// Steps numbered from 1; empty unless the kind uses steps.
    pub steps: Vec<ApprovalStep>,
}

/// Validates a rule draft.
///
/// `is_member` answers whether a user belongs to the rule's company. The first
/// id that is not a member aborts validation.
pub fn validate_rule(
    draft: &RuleDraft,
    is_member: impl Fn(Uuid) -> bool,
) -> Result<ValidatedRule, ApprovalError> {
    let name = draft.rule_name.trim();
    if name.is_empty() || draft.rule_type.trim().is_empty() {
        return Err(ApprovalError::Validation(
            "Rule name and type are required".to_string(),
        ));
    }

    let rule_type = RuleType::parse(&draft.rule_type).ok_or_else(|| {
        ApprovalError::Validation(format!("Invalid rule type '{}'", draft.rule_type.trim()))
    })?;

    let kind = RuleKind::from_parts(
        rule_type,
        draft.percentage_threshold,
        draft.specific_approver_id,
    )?;

    if let Some(approver) = kind.specific_approver()
        && !is_member(approver)
    {
        return Err(ApprovalError::InvalidApprover(approver));
    }

    let steps = if kind.uses_steps() {
        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(draft.approvers.len());
        for (&approver_id, step_order) in draft.approvers.iter().zip(1u32..) {
            if !is_member(approver_id) {
                return Err(ApprovalError::InvalidApprover(approver_id));
            }
            if !seen.insert(approver_id) {
                return Err(ApprovalError::Validation(format!(
                    "Approver {approver_id} appears more than once"
                )));
            }
            steps.push(ApprovalStep {
                step_order,
                approver_id,
            });
        }
        steps
    } else {
        Vec::new()
    };

    Ok(ValidatedRule {
        name: name.to_string(),
        is_manager_approver: draft.is_manager_approver.unwrap_or(true),
        kind,
        steps,
    })
}

/// Ids that `validate_rule` will look up, for prefetching membership.
#[must_use]
pub fn referenced_users(draft: &RuleDraft) -> Vec<Uuid> {
    draft
        .specific_approver_id
        .into_iter()
        .chain(draft.approvers.iter().copied())
        .collect()
}
