//! Repository layer for database operations.

pub mod approval;
pub mod approval_rule;
pub mod audit;
pub mod company;
pub mod expense;
pub mod user;

mod convert;

pub use approval::ApprovalRepository;
pub use approval_rule::{ApprovalRuleRepository, RuleWithSteps};
pub use audit::{AuditLogRepository, DbAuditSink};
pub use company::CompanyRepository;
pub use expense::{
    ExpenseDetail, ExpenseFilter, ExpenseRepository, ExpenseWithChain, PendingApproval,
};
pub use user::{CreateUserInput, UserRepository};
