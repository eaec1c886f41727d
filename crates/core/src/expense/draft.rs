//! Expense submission input.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::currency::normalize_code;
use crate::expense::error::ExpenseError;

/// Expense as submitted by an employee.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseDraft {
    /// Amount in the original currency.
    pub amount: Decimal,
    /// ISO currency code of `amount`.
    pub currency: String,
    /// Expense category.
    pub category: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Date the expense was incurred.
    pub expense_date: Option<NaiveDate>,
    /// Path of an uploaded receipt.
    pub receipt_path: Option<String>,
    /// Rule to route the expense through.
    pub approval_rule_id: Option<Uuid>,
}

/// A draft that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidExpense {
    /// Positive amount.
    pub amount: Decimal,
    /// Upper-case ISO code.
    pub currency: String,
    /// Trimmed category.
    pub category: String,
    /// Trimmed description, `None` when blank.
    pub description: Option<String>,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
    /// Path of an uploaded receipt.
    pub receipt_path: Option<String>,
    /// Rule to route the expense through.
    pub approval_rule_id: Option<Uuid>,
}

/// Validates a draft before anything is written.
pub fn validate_draft(draft: &ExpenseDraft) -> Result<ValidExpense, ExpenseError> {
    if draft.amount <= Decimal::ZERO {
        return Err(ExpenseError::NonPositiveAmount(draft.amount));
    }

    let currency = normalize_code(&draft.currency)
        .ok_or_else(|| ExpenseError::InvalidCurrency(draft.currency.clone()))?;

    let category = draft.category.trim();
    if category.is_empty() {
        return Err(ExpenseError::CategoryRequired);
    }

    let expense_date = draft.expense_date.ok_or(ExpenseError::DateRequired)?;

    Ok(ValidExpense {
        amount: draft.amount,
        currency,
        category: category.to_string(),
        description: draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToString::to_string),
        expense_date,
        receipt_path: draft.receipt_path.clone(),
        approval_rule_id: draft.approval_rule_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> ExpenseDraft {
        ExpenseDraft {
            amount: dec!(42.50),
            currency: "eur".to_string(),
            category: " Travel ".to_string(),
            description: Some("  ".to_string()),
            expense_date: NaiveDate::from_ymd_opt(2026, 3, 14),
            receipt_path: None,
            approval_rule_id: None,
        }
    }

    #[test]
    fn test_valid_draft_is_normalized() {
        let expense = validate_draft(&draft()).unwrap();
        assert_eq!(expense.currency, "EUR");
        assert_eq!(expense.category, "Travel");
        assert_eq!(expense.description, None);
        assert_eq!(expense.amount, dec!(42.50));
    }

    #[test]
    fn test_amount_must_be_positive() {
        for amount in [dec!(0), dec!(-1)] {
            let result = validate_draft(&ExpenseDraft { amount, ..draft() });
            assert_eq!(result, Err(ExpenseError::NonPositiveAmount(amount)));
        }
    }

    #[test]
    fn test_currency_must_be_iso_code() {
        let result = validate_draft(&ExpenseDraft {
            currency: "euro".to_string(),
            ..draft()
        });
        assert!(matches!(result, Err(ExpenseError::InvalidCurrency(_))));
    }

    #[test]
    fn test_category_required() {
        let result = validate_draft(&ExpenseDraft {
            category: "   ".to_string(),
            ..draft()
        });
        assert_eq!(result, Err(ExpenseError::CategoryRequired));
    }

    #[test]
    fn test_date_required() {
        let result = validate_draft(&ExpenseDraft {
            expense_date: None,
            ..draft()
        });
        assert_eq!(result, Err(ExpenseError::DateRequired));
        assert_eq!(ExpenseError::DateRequired.error_code(), "EXPENSE_DATE_REQUIRED");
    }
}
