//! Expense repository: submission and read models.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use claimflow_core::approval::{
    ApprovalError, ApprovalGate, AuditEntry, AuditSink, ChainBuilder, ExpenseStatus, Submission,
    UserDirectory,
};
use claimflow_core::currency::CurrencyConverter;
use claimflow_core::expense::{ExpenseDraft, validate_draft};
use claimflow_shared::types::{PageRequest, PageResponse};

use crate::entities::{
    approval_rules, audit_logs, companies, expense_approvals, expenses,
    sea_orm_active_enums::{self, ApprovalStatus},
};

use super::approval_rule::load_rule;
use super::audit::AuditLogRepository;
use super::convert::{approval_status_to_db, db_error, expense_status_to_db, step_to_db};
use super::user::UserRepository;

/// An expense with its approval chain in `step_order`.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseWithChain {
    /// The expense.
    #[serde(flatten)]
    pub expense: expenses::Model,
    /// Ledger records.
    pub approvals: Vec<expense_approvals::Model>,
}

/// An expense waiting on the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PendingApproval {
    /// The expense.
    #[serde(flatten)]
    pub expense: expenses::Model,
    /// The caller's pending record, `None` when the caller is the rule's
    /// specific approver and not on the chain.
    pub approval: Option<expense_approvals::Model>,
    /// Whether the caller's record is the lowest unresolved step.
    pub is_current_step: bool,
}

/// One expense with its ledger and audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseDetail {
    /// The expense.
    #[serde(flatten)]
    pub expense: expenses::Model,
    /// Ledger records.
    pub approvals: Vec<expense_approvals::Model>,
    /// Audit entries, oldest first.
    pub audit_trail: Vec<audit_logs::Model>,
    /// Approver named by the expense's rule, who may act without a record.
    pub specific_approver_id: Option<Uuid>,
}

impl ExpenseDetail {
    /// Owner, anyone on the chain, the rule's specific approver, and admins
    /// may see an expense.
    #[must_use]
    pub fn is_visible_to(&self, user_id: Uuid, is_admin: bool) -> bool {
        is_admin
            || self.expense.employee_id == user_id
            || self.specific_approver_id == Some(user_id)
            || self.approvals.iter().any(|a| a.approver_id == user_id)
    }
}

/// Filters for company-wide listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseFilter {
    /// Only expenses in this status.
    pub status: Option<ExpenseStatus>,
    /// Only expenses of this employee.
    pub employee_id: Option<Uuid>,
}

/// Expense repository.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Submits an expense and materializes its approval ledger.
    ///
    /// The amount is converted before the transaction opens; a conversion
    /// failure leaves nothing behind. The expense and its records are
    /// inserted together, and the audit entry is recorded after commit.
    ///
    /// # Errors
    ///
    /// * `Expense` for an invalid draft
    /// * `RuleNotFound` if the rule is missing, inactive or in another company
    /// * `Currency` if conversion fails
    /// * `Database` if a query fails
    pub async fn submit_expense(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        draft: &ExpenseDraft,
        currency: &dyn CurrencyConverter,
        audit: &dyn AuditSink,
    ) -> Result<Submission, ApprovalError> {
        let expense = validate_draft(draft)?;

        let rule = match expense.approval_rule_id {
            Some(rule_id) => Some(
                load_rule(&self.db, company_id, rule_id, true)
                    .await?
                    .ok_or(ApprovalError::RuleNotFound(rule_id))?,
            ),
            None => None,
        };

        let company = companies::Entity::find_by_id(company_id)
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| ApprovalError::Validation(format!("Unknown company {company_id}")))?;

        let directory = UserRepository::new(self.db.clone());
        if !directory.is_company_member(employee_id, company_id).await? {
            return Err(ApprovalError::Validation(format!(
                "User {employee_id} is not a member of company {company_id}"
            )));
        }
        let manager_id = directory.manager_of(employee_id).await?;

        let converted_amount = currency
            .convert(expense.amount, &expense.currency, &company.currency)
            .await?;

        let chain = ChainBuilder::build(manager_id, rule.as_ref());
        let current_step = ChainBuilder::initial_step(&chain);

        let now = Utc::now();
        let expense_id = Uuid::new_v4();
        let category = expense.category.clone();

        let txn = self.db.begin().await.map_err(db_error)?;

        expenses::ActiveModel {
            id: Set(expense_id),
            company_id: Set(company_id),
            employee_id: Set(employee_id),
            approval_rule_id: Set(expense.approval_rule_id),
            amount: Set(expense.amount),
            currency: Set(expense.currency),
            converted_amount: Set(converted_amount),
            category: Set(expense.category),
            description: Set(expense.description),
            expense_date: Set(expense.expense_date),
            receipt_path: Set(expense.receipt_path),
            status: Set(sea_orm_active_enums::ExpenseStatus::Pending),
            current_step: Set(current_step.map(step_to_db).transpose()?),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;

        let records = ChainBuilder::pending_records(&chain)
            .into_iter()
            .map(|record| {
                Ok(expense_approvals::ActiveModel {
                    id: Set(record.id),
                    expense_id: Set(expense_id),
                    approver_id: Set(record.approver_id),
                    step_order: Set(step_to_db(record.step_order)?),
                    status: Set(approval_status_to_db(record.status)),
                    comments: Set(None),
                    approved_at: Set(None),
                    created_at: Set(now.into()),
                })
            })
            .collect::<Result<Vec<_>, ApprovalError>>()?;

        if !records.is_empty() {
            expense_approvals::Entity::insert_many(records)
                .exec(&txn)
                .await
                .map_err(db_error)?;
        }

        txn.commit().await.map_err(db_error)?;

        let approval_gate = ApprovalGate::for_chain(&chain);
        if approval_gate == ApprovalGate::Unassigned {
            warn!(
                expense_id = %expense_id,
                employee_id = %employee_id,
                "Expense has no approvers: employee has no manager and no rule applies"
            );
        }

        info!(
            expense_id = %expense_id,
            company_id = %company_id,
            approvers = chain.len(),
            "Expense submitted"
        );

        audit.record(AuditEntry::created(expense_id, employee_id, &category, now));

        Ok(Submission {
            expense_id,
            chain,
            current_step,
            converted_amount,
            approval_gate,
        })
    }

    /// The employee's own expenses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Database` if a query fails.
    pub async fn list_mine(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        status: Option<ExpenseStatus>,
        page: &PageRequest,
    ) -> Result<PageResponse<ExpenseWithChain>, ApprovalError> {
        self.list_for_company(
            company_id,
            ExpenseFilter {
                status,
                employee_id: Some(employee_id),
            },
            page,
        )
        .await
    }

    /// All company expenses matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Database` if a query fails.
    pub async fn list_for_company(
        &self,
        company_id: Uuid,
        filter: ExpenseFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<ExpenseWithChain>, ApprovalError> {
        let mut query = expenses::Entity::find().filter(expenses::Column::CompanyId.eq(company_id));
        if let Some(status) = filter.status {
            query = query.filter(expenses::Column::Status.eq(expense_status_to_db(status)));
        }
        if let Some(employee_id) = filter.employee_id {
            query = query.filter(expenses::Column::EmployeeId.eq(employee_id));
        }

        let total = query.clone().count(&self.db).await.map_err(db_error)?;
        let rows = query
            .order_by_desc(expenses::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let data = attach_chains(&self.db, rows).await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Pending expenses the approver can act on, newest first.
    ///
    /// Covers expenses where the approver holds a pending record, and those
    /// whose rule names them as specific approver while they have no record.
    ///
    /// # Errors
    ///
    /// Returns `Database` if a query fails.
    pub async fn pending_for_approver(
        &self,
        company_id: Uuid,
        approver_id: Uuid,
    ) -> Result<Vec<PendingApproval>, ApprovalError> {
        let rows = expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ApproverId.eq(approver_id))
            .filter(expense_approvals::Column::Status.eq(ApprovalStatus::Pending))
            .find_also_related(expenses::Entity)
            .filter(expenses::Column::CompanyId.eq(company_id))
            .filter(expenses::Column::Status.eq(sea_orm_active_enums::ExpenseStatus::Pending))
            .order_by_desc(expenses::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let mut inbox: Vec<PendingApproval> = rows
            .into_iter()
            .filter_map(|(approval, expense)| {
                expense.map(|expense| PendingApproval {
                    is_current_step: expense.current_step == Some(approval.step_order),
                    expense,
                    approval: Some(approval),
                })
            })
            .collect();

        let signoffs = expenses::Entity::find()
            .inner_join(approval_rules::Entity)
            .filter(approval_rules::Column::SpecificApproverId.eq(approver_id))
            .filter(expenses::Column::CompanyId.eq(company_id))
            .filter(expenses::Column::Status.eq(sea_orm_active_enums::ExpenseStatus::Pending))
            .all(&self.db)
            .await
            .map_err(db_error)?;

        if !signoffs.is_empty() {
            let on_chain: HashSet<Uuid> = expense_approvals::Entity::find()
                .select_only()
                .column(expense_approvals::Column::ExpenseId)
                .filter(expense_approvals::Column::ApproverId.eq(approver_id))
                .filter(
                    expense_approvals::Column::ExpenseId.is_in(signoffs.iter().map(|e| e.id)),
                )
                .into_tuple::<Uuid>()
                .all(&self.db)
                .await
                .map_err(db_error)?
                .into_iter()
                .collect();

            inbox.extend(
                signoffs
                    .into_iter()
                    .filter(|expense| !on_chain.contains(&expense.id))
                    .map(|expense| PendingApproval {
                        expense,
                        approval: None,
                        is_current_step: false,
                    }),
            );
            inbox.sort_by(|a, b| b.expense.created_at.cmp(&a.expense.created_at));
        }

        Ok(inbox)
    }

    /// One expense of the company with its ledger and audit trail.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseNotFound` if the expense is not in the company.
    pub async fn get_detail(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
    ) -> Result<ExpenseDetail, ApprovalError> {
        let expense = expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or(ApprovalError::ExpenseNotFound(expense_id))?;

        let approvals = expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ExpenseId.eq(expense_id))
            .order_by_asc(expense_approvals::Column::StepOrder)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let audit_trail = AuditLogRepository::new(self.db.clone())
            .list_for_expense(expense_id)
            .await
            .map_err(db_error)?;

        let specific_approver_id = match expense.approval_rule_id {
            Some(rule_id) => approval_rules::Entity::find_by_id(rule_id)
                .one(&self.db)
                .await
                .map_err(db_error)?
                .and_then(|rule| rule.specific_approver_id),
            None => None,
        };

        Ok(ExpenseDetail {
            expense,
            approvals,
            audit_trail,
            specific_approver_id,
        })
    }
}

async fn attach_chains<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<expenses::Model>,
) -> Result<Vec<ExpenseWithChain>, ApprovalError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let approvals = expense_approvals::Entity::find()
        .filter(expense_approvals::Column::ExpenseId.is_in(rows.iter().map(|e| e.id)))
        .order_by_asc(expense_approvals::Column::StepOrder)
        .all(conn)
        .await
        .map_err(db_error)?;

    let mut by_expense: HashMap<Uuid, Vec<expense_approvals::Model>> = HashMap::new();
    for approval in approvals {
        by_expense.entry(approval.expense_id).or_default().push(approval);
    }

    Ok(rows
        .into_iter()
        .map(|expense| ExpenseWithChain {
            approvals: by_expense.remove(&expense.id).unwrap_or_default(),
            expense,
        })
        .collect())
}
