//! Approval workflow domain types.
//!
//! Expenses move from `Pending` to one of the terminal states `Approved` or
//! `Rejected`. Each approver owns one `ApprovalRecord` per expense, and the
//! records' `step_order` is the only ordering used anywhere in the workflow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::approval::error::ApprovalError;

/// Expense status in the approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Waiting for approvers.
    Pending,
    /// Approved (terminal).
    Approved,
    /// Rejected (terminal).
    Rejected,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true once no further action can change the expense.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single approver's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Not acted on yet.
    Pending,
    /// The approver approved.
    Approved,
    /// The approver rejected.
    Rejected,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action an approver takes on an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Approve the expense.
    Approve,
    /// Reject the expense.
    Reject,
}

impl Action {
    /// Returns the string representation of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for Action {
    type Err = ApprovalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(ApprovalError::UnknownAction(other.to_string())),
        }
    }
}

/// Rule type as stored and as accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Fixed approver steps, resolved in order.
    Sequential,
    /// Approved once a share of approvers agree.
    Percentage,
    /// One named approver finalizes.
    SpecificApprover,
    /// Specific approver, then percentage, then sequential.
    Hybrid,
}

impl RuleType {
    /// Returns the string representation of the rule type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Percentage => "percentage",
            Self::SpecificApprover => "specific_approver",
            Self::Hybrid => "hybrid",
        }
    }

    /// Parses a rule type, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "percentage" => Some(Self::Percentage),
            "specific_approver" => Some(Self::SpecificApprover),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an approval rule resolves an expense.
///
/// Each variant carries exactly the parameters its type needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Every step approves, lowest pending step first.
    Sequential,
    /// `approved * 100 >= threshold * total`.
    Percentage {
        /// Required share of approvals, 1..=100.
        threshold: u8,
    },
    /// The named approver finalizes on approval.
    SpecificApprover {
        /// The approver whose approval finalizes the expense.
        approver_id: Uuid,
    },
    /// Specific approver, then percentage, then sequential.
    Hybrid {
        /// Required share of approvals, 1..=100.
        threshold: u8,
        /// The approver whose approval finalizes the expense.
        approver_id: Uuid,
    },
}

impl RuleKind {
    /// Rebuilds a kind from its stored columns.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::Validation` when a required parameter is missing
    /// or the threshold is outside 1..=100.
    pub fn from_parts(
        rule_type: RuleType,
        threshold: Option<i32>,
        approver_id: Option<Uuid>,
    ) -> Result<Self, ApprovalError> {
        let threshold = || -> Result<u8, ApprovalError> {
            let value = threshold.ok_or_else(|| {
                ApprovalError::Validation(format!(
                    "percentage threshold is required for {rule_type} rules"
                ))
            })?;
            u8::try_from(value)
                .ok()
                .filter(|t| (1..=100).contains(t))
                .ok_or_else(|| {
                    ApprovalError::Validation(format!(
                        "percentage threshold must be between 1 and 100, got {value}"
                    ))
                })
        };
        let approver = || {
            approver_id.ok_or_else(|| {
                ApprovalError::Validation(format!(
                    "specific approver is required for {rule_type} rules"
                ))
            })
        };

        Ok(match rule_type {
            RuleType::Sequential => Self::Sequential,
            RuleType::Percentage => Self::Percentage {
                threshold: threshold()?,
            },
            RuleType::SpecificApprover => Self::SpecificApprover {
                approver_id: approver()?,
            },
            RuleType::Hybrid => Self::Hybrid {
                threshold: threshold()?,
                approver_id: approver()?,
            },
        })
    }

    /// Returns the stored rule type.
    #[must_use]
    pub const fn rule_type(&self) -> RuleType {
        match self {
            Self::Sequential => RuleType::Sequential,
            Self::Percentage { .. } => RuleType::Percentage,
            Self::SpecificApprover { .. } => RuleType::SpecificApprover,
            Self::Hybrid { .. } => RuleType::Hybrid,
        }
    }

    /// Percentage threshold, if the kind has one.
    #[must_use]
    pub const fn threshold(&self) -> Option<u8> {
        match self {
            Self::Percentage { threshold } | Self::Hybrid { threshold, .. } => Some(*threshold),
            Self::Sequential | Self::SpecificApprover { .. } => None,
        }
    }

    /// Specific approver, if the kind has one.
    #[must_use]
    pub const fn specific_approver(&self) -> Option<Uuid> {
        match self {
            Self::SpecificApprover { approver_id } | Self::Hybrid { approver_id, .. } => {
                Some(*approver_id)
            }
            Self::Sequential | Self::Percentage { .. } => None,
        }
    }

    /// Returns true when the rule's steps are materialized into the chain.
    #[must_use]
    pub const fn uses_steps(&self) -> bool {
        matches!(self, Self::Sequential | Self::Hybrid { .. })
    }
}

/// One fixed position in a rule's approver list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// 1-based position, unique per rule.
    pub step_order: u32,
    /// Approver at this position.
    pub approver_id: Uuid,
}

/// A company-scoped approval rule with its steps.
#[derive(Debug, Clone)]
pub struct ApprovalRule {
    /// Rule ID.
    pub id: Uuid,
    /// Owning company.
    pub company_id: Uuid,
    /// Display name.
    pub name: String,
    /// Inactive rules cannot be chosen for new expenses.
    pub is_active: bool,
    /// Put the submitter's manager first in the chain.
    pub is_manager_approver: bool,
    /// Resolution strategy.
    pub kind: RuleKind,
    /// Steps, ordered by `step_order` when loaded.
    pub steps: Vec<ApprovalStep>,
}

/// One approver position materialized for an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    /// The approver.
    pub approver_id: Uuid,
    /// 1-based position in the chain.
    pub step_order: u32,
}

/// Whether a freshly created expense has anyone who can act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalGate {
    /// At least one approver is assigned.
    Assigned,
    /// No manager and no rule steps: the expense waits with nobody assigned.
    Unassigned,
}

impl ApprovalGate {
    /// Gate for a built chain.
    #[must_use]
    pub fn for_chain(chain: &[ChainLink]) -> Self {
        if chain.is_empty() {
            Self::Unassigned
        } else {
            Self::Assigned
        }
    }
}

/// Per-approver ledger entry for one expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Record ID.
    pub id: Uuid,
    /// The approver.
    pub approver_id: Uuid,
    /// 1-based position, unique per expense.
    pub step_order: u32,
    /// Current status.
    pub status: ApprovalStatus,
    /// Approver's comment; always present on rejections.
    pub comments: Option<String>,
    /// When the approver acted.
    pub approved_at: Option<DateTime<Utc>>,
}

impl ApprovalRecord {
    /// Creates a pending record for a chain position.
    #[must_use]
    pub fn pending(link: ChainLink) -> Self {
        Self {
            id: Uuid::new_v4(),
            approver_id: link.approver_id,
            step_order: link.step_order,
            status: ApprovalStatus::Pending,
            comments: None,
            approved_at: None,
        }
    }
}

/// The workflow state of an expense that the engine reads and drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpenseState {
    /// Expense ID.
    pub id: Uuid,
    /// Current status.
    pub status: ExpenseStatus,
    /// Lowest unresolved step, `None` when no chain record is pending.
    pub current_step: Option<u32>,
}

/// How one decision resolved the expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Decision {
    /// The approver rejected; the expense is rejected.
    Rejected,
    /// The rule's specific approver approved; the expense is approved.
    SpecificApprover,
    /// Enough approvers agreed; the expense is approved.
    PercentageThreshold {
        /// Approved records, including this one.
        approved: u32,
        /// All records of the expense.
        total: u32,
    },
    /// The last pending record was approved; the expense is approved.
    SequentialComplete,
    /// Still pending; the chain moved to `current_step`.
    Advanced {
        /// Lowest step still pending.
        current_step: u32,
    },
    /// Every chain record approved, but only the specific approver may
    /// finalize. No step is current.
    AwaitingSignoff,
}

impl Decision {
    /// Expense status after this decision.
    #[must_use]
    pub const fn expense_status(&self) -> ExpenseStatus {
        match self {
            Self::Rejected => ExpenseStatus::Rejected,
            Self::SpecificApprover
            | Self::PercentageThreshold { .. }
            | Self::SequentialComplete => ExpenseStatus::Approved,
            Self::Advanced { .. } | Self::AwaitingSignoff => ExpenseStatus::Pending,
        }
    }
}

/// Result of applying one approver action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The acting approver's record after the action.
    pub record: ApprovalRecord,
    /// True when `record` is a new override record that must be inserted.
    pub appended: bool,
    /// Expense state after the action.
    pub expense: ExpenseState,
    /// How the expense was resolved.
    pub decision: Decision,
}

/// Result of submitting an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    /// New expense ID.
    pub expense_id: Uuid,
    /// Approvers materialized for the expense.
    pub chain: Vec<ChainLink>,
    /// `Some(1)` when the chain is non-empty.
    pub current_step: Option<u32>,
    /// Amount in the company currency.
    pub converted_amount: Decimal,
    /// Whether anyone can act on the expense.
    pub approval_gate: ApprovalGate,
}

/// Result of a committed decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecisionSummary {
    /// The expense.
    pub expense_id: Uuid,
    /// Status after the decision.
    pub status: ExpenseStatus,
    /// Lowest unresolved step after the decision.
    pub current_step: Option<u32>,
    /// How the expense was resolved.
    pub decision: Decision,
}

impl DecisionSummary {
    /// Summary of an engine outcome.
    #[must_use]
    pub const fn from_outcome(outcome: &Outcome) -> Self {
        Self {
            expense_id: outcome.expense.id,
            status: outcome.expense.status,
            current_step: outcome.expense.current_step,
            decision: outcome.decision,
        }
    }
}
