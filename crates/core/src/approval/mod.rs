//! Expense approval workflow.
//!
//! This module implements approval rules, approver-chain construction at
//! submission, and the decision state machine applied on every approver
//! action.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (statuses, RuleKind, ApprovalRecord, Decision)
//! - `error` - Approval-specific error types
//! - `validation` - Rule draft validation
//! - `chain` - Approver chain builder
//! - `engine` - Decision engine
//! - `audit` - Audit entries and the sink contract
//! - `directory` - User directory contract
//! - `memory` - In-memory store with per-expense locking

pub mod audit;
pub mod chain;
pub mod directory;
pub mod engine;
pub mod error;
pub mod memory;
pub mod types;
pub mod validation;

#[cfg(test)]
mod chain_props;
#[cfg(test)]
mod engine_props;

pub use audit::{AuditAction, AuditEntry, AuditSink, MemoryAuditSink};
pub use chain::ChainBuilder;
pub use directory::{MemoryDirectory, UserDirectory};
pub use engine::{ActionRequest, DecisionEngine};
pub use error::{ApprovalError, ErrorKind};
pub use memory::{MemoryStore, StoredExpense};
pub use types::{
    Action, ApprovalGate, ApprovalRecord, ApprovalRule, ApprovalStatus, ApprovalStep, ChainLink,
    Decision, DecisionSummary, ExpenseState, ExpenseStatus, Outcome, RuleKind, RuleType,
    Submission,
};
pub use validation::{RuleDraft, ValidatedRule, referenced_users, validate_rule};
