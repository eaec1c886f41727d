//! Approval workflow error types.
//!
//! Every variant belongs to one [`ErrorKind`], which decides the HTTP status
//! and whether the caller can fix the request.

use thiserror::Error;
use uuid::Uuid;

use claimflow_shared::AppError;

use crate::approval::types::{ApprovalStatus, ExpenseStatus};
use crate::currency::CurrencyError;
use crate::expense::ExpenseError;

/// Coarse classification of approval errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed rule or expense input.
    Validation,
    /// Expense, rule or record missing or outside the company.
    NotFound,
    /// Action not allowed in the current workflow state.
    InvalidAction,
    /// A concurrent decision finalized the expense first.
    Conflict,
    /// Database failure or broken ledger invariant.
    Infrastructure,
    /// An external collaborator (exchange rates) failed.
    ExternalService,
}

/// Errors that can occur during approval workflow operations.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// Malformed rule input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced user is not a member of the company.
    #[error("Invalid approver ID: {0}")]
    InvalidApprover(Uuid),

    /// Malformed expense draft.
    #[error(transparent)]
    Expense(#[from] ExpenseError),

    /// Rule not found in the company.
    #[error("Approval rule {0} not found")]
    RuleNotFound(Uuid),

    /// Expense not found in the company.
    #[error("Expense {0} not found")]
    ExpenseNotFound(Uuid),

    /// The expense already reached a terminal status.
    #[error("Expense is already {status}")]
    ExpenseNotPending {
        /// The expense's current status.
        status: ExpenseStatus,
    },

    /// The caller has no record on this expense and is not the specific approver.
    #[error("User {approver_id} is not an approver for this expense")]
    NotAssigned {
        /// The user who attempted to act.
        approver_id: Uuid,
    },

    /// The caller already acted on this expense.
    #[error("User {approver_id} has already {status} this expense")]
    AlreadyDecided {
        /// The user who attempted to act.
        approver_id: Uuid,
        /// Status of their existing record.
        status: ApprovalStatus,
    },

    /// Action other than approve or reject.
    #[error("Unknown action '{0}', expected 'approve' or 'reject'")]
    UnknownAction(String),

    /// Reject without a comment.
    #[error("A comment is required to reject an expense")]
    RejectCommentRequired,

    /// A concurrent decision won the race.
    #[error("Expense {0} was finalized by a concurrent decision")]
    Conflict(Uuid),

    /// Stored ledger contradicts the workflow invariants.
    #[error("Ledger invariant violated: {0}")]
    LedgerInvariant(String),

    /// Currency conversion failed.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ApprovalError {
    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidApprover(_) | Self::Expense(_) => {
                ErrorKind::Validation
            }
            Self::RuleNotFound(_) | Self::ExpenseNotFound(_) => ErrorKind::NotFound,
            Self::ExpenseNotPending { .. }
            | Self::NotAssigned { .. }
            | Self::AlreadyDecided { .. }
            | Self::UnknownAction(_)
            | Self::RejectCommentRequired => ErrorKind::InvalidAction,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::LedgerInvariant(_) | Self::Database(_) => ErrorKind::Infrastructure,
            Self::Currency(_) => ErrorKind::ExternalService,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidAction => {
                if matches!(self, Self::NotAssigned { .. }) {
                    403
                } else {
                    400
                }
            }
            ErrorKind::Conflict => 409,
            ErrorKind::Infrastructure => 500,
            ErrorKind::ExternalService => 502,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidApprover(_) => "INVALID_APPROVER",
            Self::Expense(e) => e.error_code(),
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::ExpenseNotPending { .. } => "EXPENSE_NOT_PENDING",
            Self::NotAssigned { .. } => "NOT_ASSIGNED_APPROVER",
            Self::AlreadyDecided { .. } => "ALREADY_DECIDED",
            Self::UnknownAction(_) => "INVALID_ACTION",
            Self::RejectCommentRequired => "REJECTION_COMMENT_REQUIRED",
            Self::Conflict(_) => "CONFLICT",
            Self::LedgerInvariant(_) => "LEDGER_INVARIANT_VIOLATED",
            Self::Currency(_) => "CURRENCY_CONVERSION_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::InvalidAction if err.status_code() == 403 => Self::Forbidden(message),
            ErrorKind::InvalidAction => Self::InvalidAction(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Infrastructure => match err {
                ApprovalError::Database(msg) => Self::Database(msg),
                _ => Self::Internal(message),
            },
            ErrorKind::ExternalService => Self::ExternalService(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ApprovalError::Validation("bad".into()), ErrorKind::Validation, 400, "VALIDATION_ERROR")]
    #[case(ApprovalError::InvalidApprover(Uuid::nil()), ErrorKind::Validation, 400, "INVALID_APPROVER")]
    #[case(ApprovalError::RuleNotFound(Uuid::nil()), ErrorKind::NotFound, 404, "RULE_NOT_FOUND")]
    #[case(ApprovalError::ExpenseNotFound(Uuid::nil()), ErrorKind::NotFound, 404, "EXPENSE_NOT_FOUND")]
    #[case(
        ApprovalError::ExpenseNotPending { status: ExpenseStatus::Approved },
        ErrorKind::InvalidAction,
        400,
        "EXPENSE_NOT_PENDING"
    )]
    #[case(
        ApprovalError::NotAssigned { approver_id: Uuid::nil() },
        ErrorKind::InvalidAction,
        403,
        "NOT_ASSIGNED_APPROVER"
    )]
    #[case(
        ApprovalError::AlreadyDecided { approver_id: Uuid::nil(), status: ApprovalStatus::Approved },
        ErrorKind::InvalidAction,
        400,
        "ALREADY_DECIDED"
    )]
    #[case(ApprovalError::UnknownAction("hold".into()), ErrorKind::InvalidAction, 400, "INVALID_ACTION")]
    #[case(ApprovalError::RejectCommentRequired, ErrorKind::InvalidAction, 400, "REJECTION_COMMENT_REQUIRED")]
    #[case(ApprovalError::Conflict(Uuid::nil()), ErrorKind::Conflict, 409, "CONFLICT")]
    #[case(ApprovalError::LedgerInvariant("x".into()), ErrorKind::Infrastructure, 500, "LEDGER_INVARIANT_VIOLATED")]
    #[case(ApprovalError::Database("down".into()), ErrorKind::Infrastructure, 500, "DATABASE_ERROR")]
    #[case(
        ApprovalError::Currency(CurrencyError::UnsupportedCurrency("XYZ".into())),
        ErrorKind::ExternalService,
        502,
        "CURRENCY_CONVERSION_FAILED"
    )]
    fn test_error_classification(
        #[case] err: ApprovalError,
        #[case] kind: ErrorKind,
        #[case] status: u16,
        #[case] code: &str,
    ) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_expense_not_pending_message() {
        let err = ApprovalError::ExpenseNotPending {
            status: ExpenseStatus::Rejected,
        };
        assert_eq!(err.to_string(), "Expense is already rejected");
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = ApprovalError::NotAssigned {
            approver_id: Uuid::nil(),
        }
        .into();
        assert_eq!(app.status_code(), 403);

        let app: AppError = ApprovalError::Conflict(Uuid::nil()).into();
        assert!(matches!(app, AppError::Conflict(_)));

        let app: AppError = ApprovalError::LedgerInvariant("rejected record".into()).into();
        assert!(matches!(app, AppError::Internal(_)));

        let app: AppError = ApprovalError::Database("gone".into()).into();
        assert!(matches!(app, AppError::Database(msg) if msg == "gone"));
    }
}
