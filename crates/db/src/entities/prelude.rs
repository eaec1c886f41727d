//! Entity re-exports.

pub use super::approval_rules::Entity as ApprovalRules;
pub use super::approval_steps::Entity as ApprovalSteps;
pub use super::audit_logs::Entity as AuditLogs;
pub use super::companies::Entity as Companies;
pub use super::expense_approvals::Entity as ExpenseApprovals;
pub use super::expenses::Entity as Expenses;
pub use super::users::Entity as Users;
