//! Decision engine: applies one approver action to an expense.
//!
//! Precedence on approve is fixed: specific approver, then percentage
//! threshold, then sequential advance. Reject always finalizes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::approval::error::ApprovalError;
use crate::approval::types::{
    Action, ApprovalRecord, ApprovalStatus, Decision, ExpenseState, ExpenseStatus, Outcome,
    RuleKind,
};

/// A single approver action.
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest<'a> {
    /// The acting user.
    pub approver_id: Uuid,
    /// Approve or reject.
    pub action: Action,
    /// Optional comment, required for reject.
    pub comment: Option<&'a str>,
    /// Decision timestamp.
    pub at: DateTime<Utc>,
}

/// Stateless engine for approval decisions.
pub struct DecisionEngine;

impl DecisionEngine {
    /// Applies an approver action to the expense's ledger.
    ///
    /// `kind` is `None` for expenses created without a rule; those resolve
    /// through the sequential path only.
    ///
    /// # Errors
    ///
    /// * `ExpenseNotPending` if the expense is already final
    /// * `LedgerInvariant` if the ledger holds a rejection on a pending expense
    /// * `NotAssigned` if the caller has no record and is not the specific approver
    /// * `AlreadyDecided` if the caller's record is no longer pending
    /// * `RejectCommentRequired` if a reject carries no comment
    pub fn decide(
        expense: &ExpenseState,
        kind: Option<&RuleKind>,
        records: &[ApprovalRecord],
        request: &ActionRequest<'_>,
    ) -> Result<Outcome, ApprovalError> {
        if expense.status != ExpenseStatus::Pending {
            return Err(ApprovalError::ExpenseNotPending {
                status: expense.status,
            });
        }

        if let Some(rejected) = records
            .iter()
            .find(|r| r.status == ApprovalStatus::Rejected)
        {
            return Err(ApprovalError::LedgerInvariant(format!(
                "expense {} is pending but record {} is rejected",
                expense.id, rejected.id
            )));
        }

        let specific = kind.and_then(RuleKind::specific_approver);
        let (mut record, appended) = Self::target_record(records, specific, request.approver_id)?;

        let comment = request
            .comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(ToString::to_string);

        if request.action == Action::Reject {
            let Some(comment) = comment else {
                return Err(ApprovalError::RejectCommentRequired);
            };
            record.status = ApprovalStatus::Rejected;
            record.comments = Some(comment);
            record.approved_at = Some(request.at);

            return Ok(Outcome {
                record,
                appended,
                expense: ExpenseState {
                    status: ExpenseStatus::Rejected,
                    ..*expense
                },
                decision: Decision::Rejected,
            });
        }

        record.status = ApprovalStatus::Approved;
        record.comments = comment;
        record.approved_at = Some(request.at);

        let ledger = Self::ledger_after(records, &record, appended);
        let decision = Self::resolve_approval(kind, &ledger, request.approver_id);

        let current_step = match decision {
            Decision::Advanced { current_step } => Some(current_step),
            Decision::AwaitingSignoff => None,
            _ => expense.current_step,
        };

        Ok(Outcome {
            record,
            appended,
            expense: ExpenseState {
                id: expense.id,
                status: decision.expense_status(),
                current_step,
            },
            decision,
        })
    }

    /// Finds the record the action applies to, appending an override record
    /// for a specific approver who is not in the chain.
    fn target_record(
        records: &[ApprovalRecord],
        specific: Option<Uuid>,
        approver_id: Uuid,
    ) -> Result<(ApprovalRecord, bool), ApprovalError> {
        match records.iter().find(|r| r.approver_id == approver_id) {
            Some(r) if r.status == ApprovalStatus::Pending => Ok((r.clone(), false)),
            Some(r) => Err(ApprovalError::AlreadyDecided {
                approver_id,
                status: r.status,
            }),
            None if specific == Some(approver_id) => {
                let step_order = records.iter().map(|r| r.step_order).max().unwrap_or(0) + 1;
                Ok((
                    ApprovalRecord {
                        id: Uuid::new_v4(),
                        approver_id,
                        step_order,
                        status: ApprovalStatus::Pending,
                        comments: None,
                        approved_at: None,
                    },
                    true,
                ))
            }
            None => Err(ApprovalError::NotAssigned { approver_id }),
        }
    }

    fn ledger_after(
        records: &[ApprovalRecord],
        updated: &ApprovalRecord,
        appended: bool,
    ) -> Vec<ApprovalRecord> {
        let mut ledger: Vec<ApprovalRecord> = records
            .iter()
            .map(|r| {
                if r.id == updated.id {
                    updated.clone()
                } else {
                    r.clone()
                }
            })
            .collect();
        if appended {
            ledger.push(updated.clone());
        }
        ledger
    }

    /// Ordered dispatch over the rule kind after an approval was recorded.
    fn resolve_approval(
        kind: Option<&RuleKind>,
        ledger: &[ApprovalRecord],
        approver_id: Uuid,
    ) -> Decision {
        if kind.and_then(RuleKind::specific_approver) == Some(approver_id) {
            return Decision::SpecificApprover;
        }

        if let Some(threshold) = kind.and_then(RuleKind::threshold) {
            let (approved, total) = Self::tally(ledger);
            if Self::meets_threshold(approved, total, threshold) {
                return Decision::PercentageThreshold { approved, total };
            }
        }

        match Self::lowest_pending_step(ledger) {
            Some(current_step) => Decision::Advanced { current_step },
            None if matches!(kind, Some(RuleKind::SpecificApprover { .. })) => {
                Decision::AwaitingSignoff
            }
            None => Decision::SequentialComplete,
        }
    }

    /// Counts approved records and all records.
    #[must_use]
    pub fn tally(ledger: &[ApprovalRecord]) -> (u32, u32) {
        let approved = ledger
            .iter()
            .filter(|r| r.status == ApprovalStatus::Approved)
            .count();
        (
            u32::try_from(approved).unwrap_or(u32::MAX),
            u32::try_from(ledger.len()).unwrap_or(u32::MAX),
        )
    }

    /// Inclusive integer threshold check: `approved * 100 >= threshold * total`.
    #[must_use]
    pub fn meets_threshold(approved: u32, total: u32, threshold: u8) -> bool {
        total > 0 && u64::from(approved) * 100 >= u64::from(threshold) * u64::from(total)
    }

    /// Lowest `step_order` still pending.
    #[must_use]
    pub fn lowest_pending_step(ledger: &[ApprovalRecord]) -> Option<u32> {
        ledger
            .iter()
            .filter(|r| r.status == ApprovalStatus::Pending)
            .map(|r| r.step_order)
            .min()
    }
}
