//! Approval repository: applies approver decisions inside a transaction.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use claimflow_core::approval::{
    Action, ActionRequest, ApprovalError, AuditEntry, AuditSink, DecisionEngine, DecisionSummary,
};

use crate::entities::{approval_rules, expense_approvals, expenses, sea_orm_active_enums};

use super::convert::{
    approval_status_to_db, decision_db_error, expense_state, expense_status_to_db, record_to_core,
    rule_kind, step_to_db,
};

/// Approval repository.
#[derive(Debug, Clone)]
pub struct ApprovalRepository {
    db: DatabaseConnection,
}

impl ApprovalRepository {
    /// Creates a new approval repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Applies one approver action to an expense.
    ///
    /// The expense row is locked (`FOR UPDATE`) before the ledger is read, so
    /// concurrent actions on one expense run one after another. Both writes
    /// are guarded on `status = 'pending'`; a guard miss is a `Conflict`.
    /// Any error rolls the whole transaction back. The audit entry is
    /// recorded only after commit.
    ///
    /// # Errors
    ///
    /// * `UnknownAction` for an action other than approve/reject
    /// * `ExpenseNotFound` if the expense is not in the company
    /// * any error of [`DecisionEngine::decide`]
    /// * `Conflict` if a competing transaction finalized the expense first
    /// * `Database` if a query fails
    pub async fn decide(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
        approver_id: Uuid,
        action: &str,
        comment: Option<&str>,
        audit: &dyn AuditSink,
    ) -> Result<DecisionSummary, ApprovalError> {
        let action: Action = action.parse()?;
        let map_err = decision_db_error(expense_id);

        let txn = self.db.begin().await.map_err(&map_err)?;

        let expense = expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::CompanyId.eq(company_id))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(&map_err)?
            .ok_or(ApprovalError::ExpenseNotFound(expense_id))?;

        let kind = match expense.approval_rule_id {
            Some(rule_id) => approval_rules::Entity::find_by_id(rule_id)
                .one(&txn)
                .await
                .map_err(&map_err)?
                .as_ref()
                .map(rule_kind)
                .transpose()?,
            None => None,
        };

        let records = expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ExpenseId.eq(expense_id))
            .order_by_asc(expense_approvals::Column::StepOrder)
            .all(&txn)
            .await
            .map_err(&map_err)?
            .iter()
            .map(record_to_core)
            .collect::<Result<Vec<_>, _>>()?;

        let now = Utc::now();
        let outcome = DecisionEngine::decide(
            &expense_state(&expense)?,
            kind.as_ref(),
            &records,
            &ActionRequest {
                approver_id,
                action,
                comment,
                at: now,
            },
        )?;

        let record = &outcome.record;
        if outcome.appended {
            expense_approvals::ActiveModel {
                id: Set(record.id),
                expense_id: Set(expense_id),
                approver_id: Set(record.approver_id),
                step_order: Set(step_to_db(record.step_order)?),
                status: Set(approval_status_to_db(record.status)),
                comments: Set(record.comments.clone()),
                approved_at: Set(record.approved_at.map(Into::into)),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await
            .map_err(&map_err)?;
        } else {
            let result = expense_approvals::Entity::update_many()
                .set(expense_approvals::ActiveModel {
                    status: Set(approval_status_to_db(record.status)),
                    comments: Set(record.comments.clone()),
                    approved_at: Set(record.approved_at.map(Into::into)),
                    ..Default::default()
                })
                .filter(expense_approvals::Column::Id.eq(record.id))
                .filter(
                    expense_approvals::Column::Status
                        .eq(sea_orm_active_enums::ApprovalStatus::Pending),
                )
                .exec(&txn)
                .await
                .map_err(&map_err)?;

            if result.rows_affected == 0 {
                return Err(ApprovalError::Conflict(expense_id));
            }
        }

        let result = expenses::Entity::update_many()
            .set(expenses::ActiveModel {
                status: Set(expense_status_to_db(outcome.expense.status)),
                current_step: Set(outcome.expense.current_step.map(step_to_db).transpose()?),
                updated_at: Set(now.into()),
                ..Default::default()
            })
            .filter(expenses::Column::Id.eq(expense_id))
            .filter(expenses::Column::Status.eq(sea_orm_active_enums::ExpenseStatus::Pending))
            .exec(&txn)
            .await
            .map_err(&map_err)?;

        if result.rows_affected == 0 {
            return Err(ApprovalError::Conflict(expense_id));
        }

        txn.commit().await.map_err(&map_err)?;

        info!(
            expense_id = %expense_id,
            approver_id = %approver_id,
            action = action.as_str(),
            status = outcome.expense.status.as_str(),
            "Decision applied"
        );

        audit.record(AuditEntry::decision(
            expense_id,
            approver_id,
            action,
            comment,
            now,
        ));

        Ok(DecisionSummary::from_outcome(&outcome))
    }
}
