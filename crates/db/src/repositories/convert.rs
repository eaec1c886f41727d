//! Conversions between database rows and core workflow types.

use chrono::{DateTime, Utc};
use sea_orm::{DbErr, RuntimeErr};
use tracing::error;
use uuid::Uuid;

use claimflow_core::approval::{
    ApprovalError, ApprovalRecord, ApprovalRule, ApprovalStatus, ApprovalStep, ExpenseState,
    ExpenseStatus, RuleKind, RuleType,
};

use crate::entities::{
    approval_rules, approval_steps, expense_approvals, expenses, sea_orm_active_enums,
};

/// Postgres `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// Postgres `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

/// Maps a database error to an infrastructure error.
pub(crate) fn db_error(err: DbErr) -> ApprovalError {
    error!(error = %err, "Database error");
    ApprovalError::Database(err.to_string())
}

/// Maps a database error raised while deciding on an expense.
///
/// Serialization failures and deadlocks mean a competing transaction won.
pub(crate) fn decision_db_error(expense_id: Uuid) -> impl Fn(DbErr) -> ApprovalError {
    move |err| match sqlstate(&err).as_deref() {
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => ApprovalError::Conflict(expense_id),
        _ => db_error(err),
    }
}

fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => {
            e.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

pub(crate) const fn expense_status_to_core(
    status: &sea_orm_active_enums::ExpenseStatus,
) -> ExpenseStatus {
    match status {
        sea_orm_active_enums::ExpenseStatus::Pending => ExpenseStatus::Pending,
        sea_orm_active_enums::ExpenseStatus::Approved => ExpenseStatus::Approved,
        sea_orm_active_enums::ExpenseStatus::Rejected => ExpenseStatus::Rejected,
    }
}

pub(crate) const fn expense_status_to_db(
    status: ExpenseStatus,
) -> sea_orm_active_enums::ExpenseStatus {
    match status {
        ExpenseStatus::Pending => sea_orm_active_enums::ExpenseStatus::Pending,
        ExpenseStatus::Approved => sea_orm_active_enums::ExpenseStatus::Approved,
        ExpenseStatus::Rejected => sea_orm_active_enums::ExpenseStatus::Rejected,
    }
}

pub(crate) const fn approval_status_to_core(
    status: &sea_orm_active_enums::ApprovalStatus,
) -> ApprovalStatus {
    match status {
        sea_orm_active_enums::ApprovalStatus::Pending => ApprovalStatus::Pending,
        sea_orm_active_enums::ApprovalStatus::Approved => ApprovalStatus::Approved,
        sea_orm_active_enums::ApprovalStatus::Rejected => ApprovalStatus::Rejected,
    }
}

pub(crate) const fn approval_status_to_db(
    status: ApprovalStatus,
) -> sea_orm_active_enums::ApprovalStatus {
    match status {
        ApprovalStatus::Pending => sea_orm_active_enums::ApprovalStatus::Pending,
        ApprovalStatus::Approved => sea_orm_active_enums::ApprovalStatus::Approved,
        ApprovalStatus::Rejected => sea_orm_active_enums::ApprovalStatus::Rejected,
    }
}

pub(crate) const fn rule_type_to_core(
    rule_type: &sea_orm_active_enums::ApprovalRuleType,
) -> RuleType {
    match rule_type {
        sea_orm_active_enums::ApprovalRuleType::Sequential => RuleType::Sequential,
        sea_orm_active_enums::ApprovalRuleType::Percentage => RuleType::Percentage,
        sea_orm_active_enums::ApprovalRuleType::SpecificApprover => RuleType::SpecificApprover,
        sea_orm_active_enums::ApprovalRuleType::Hybrid => RuleType::Hybrid,
    }
}

pub(crate) const fn rule_type_to_db(rule_type: RuleType) -> sea_orm_active_enums::ApprovalRuleType {
    match rule_type {
        RuleType::Sequential => sea_orm_active_enums::ApprovalRuleType::Sequential,
        RuleType::Percentage => sea_orm_active_enums::ApprovalRuleType::Percentage,
        RuleType::SpecificApprover => sea_orm_active_enums::ApprovalRuleType::SpecificApprover,
        RuleType::Hybrid => sea_orm_active_enums::ApprovalRuleType::Hybrid,
    }
}

/// Step position as stored in Postgres.
pub(crate) fn step_to_db(step_order: u32) -> Result<i32, ApprovalError> {
    i32::try_from(step_order)
        .map_err(|_| ApprovalError::LedgerInvariant(format!("Step {step_order} out of range")))
}

fn step_to_core(step_order: i32) -> Result<u32, ApprovalError> {
    u32::try_from(step_order)
        .ok()
        .filter(|step| *step >= 1)
        .ok_or_else(|| ApprovalError::LedgerInvariant(format!("Invalid step order {step_order}")))
}

pub(crate) fn record_to_core(
    model: &expense_approvals::Model,
) -> Result<ApprovalRecord, ApprovalError> {
    Ok(ApprovalRecord {
        id: model.id,
        approver_id: model.approver_id,
        step_order: step_to_core(model.step_order)?,
        status: approval_status_to_core(&model.status),
        comments: model.comments.clone(),
        approved_at: model.approved_at.map(|at| at.with_timezone(&Utc)),
    })
}

pub(crate) fn expense_state(model: &expenses::Model) -> Result<ExpenseState, ApprovalError> {
    Ok(ExpenseState {
        id: model.id,
        status: expense_status_to_core(&model.status),
        current_step: model.current_step.map(step_to_core).transpose()?,
    })
}

/// Rebuilds the tagged rule kind from its stored columns.
pub(crate) fn rule_kind(model: &approval_rules::Model) -> Result<RuleKind, ApprovalError> {
    RuleKind::from_parts(
        rule_type_to_core(&model.rule_type),
        model.percentage_threshold,
        model.specific_approver_id,
    )
    .map_err(|e| ApprovalError::LedgerInvariant(format!("Stored rule {} is invalid: {e}", model.id)))
}

pub(crate) fn rule_to_core(
    model: &approval_rules::Model,
    steps: &[approval_steps::Model],
) -> Result<ApprovalRule, ApprovalError> {
    let steps = steps
        .iter()
        .map(|step| {
            Ok(ApprovalStep {
                step_order: step_to_core(step.step_order)?,
                approver_id: step.approver_id,
            })
        })
        .collect::<Result<Vec<_>, ApprovalError>>()?;

    Ok(ApprovalRule {
        id: model.id,
        company_id: model.company_id,
        name: model.rule_name.clone(),
        is_active: model.is_active,
        is_manager_approver: model.is_manager_approver,
        kind: rule_kind(model)?,
        steps,
    })
}

pub(crate) fn to_utc(at: sea_orm::prelude::DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}
