//! `SeaORM` entities.

pub mod prelude;

pub mod approval_rules;
pub mod approval_steps;
pub mod audit_logs;
pub mod companies;
pub mod expense_approvals;
pub mod expenses;
pub mod sea_orm_active_enums;
pub mod users;
