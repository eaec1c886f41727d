//! Expense drafts and their validation.

pub mod draft;
pub mod error;

pub use draft::{ExpenseDraft, ValidExpense, validate_draft};
pub use error::ExpenseError;
