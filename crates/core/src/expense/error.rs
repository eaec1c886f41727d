//! Expense validation errors.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors found in an expense draft.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpenseError {
    /// Amount is zero or negative.
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// Currency is not a three-letter code.
    #[error("Invalid currency code '{0}'")]
    InvalidCurrency(String),

    /// Category missing or blank.
    #[error("Category is required")]
    CategoryRequired,

    /// Expense date missing.
    #[error("Expense date is required")]
    DateRequired,
}

impl ExpenseError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "INVALID_AMOUNT",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::CategoryRequired => "CATEGORY_REQUIRED",
            Self::DateRequired => "EXPENSE_DATE_REQUIRED",
        }
    }
}
