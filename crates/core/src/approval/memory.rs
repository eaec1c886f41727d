//! In-memory approval store.
//!
//! Runs the full submit and decide flows without a database. Each expense has
//! its own async mutex; the read-decide-write sequence of a decision holds it,
//! so concurrent actions on one expense are serialized while different
//! expenses proceed independently.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::approval::audit::{AuditEntry, AuditSink};
use crate::approval::chain::ChainBuilder;
use crate::approval::directory::UserDirectory;
use crate::approval::engine::{ActionRequest, DecisionEngine};
use crate::approval::error::ApprovalError;
use crate::approval::types::{
    Action, ApprovalGate, ApprovalRecord, ApprovalRule, DecisionSummary, ExpenseState,
    ExpenseStatus, Submission,
};
use crate::approval::validation::{RuleDraft, referenced_users, validate_rule};
use crate::currency::CurrencyConverter;
use crate::expense::{ExpenseDraft, validate_draft};

/// An expense with its ledger.
#[derive(Debug, Clone)]
pub struct StoredExpense {
    /// Expense ID.
    pub id: Uuid,
    /// Owning company.
    pub company_id: Uuid,
    /// Submitter.
    pub employee_id: Uuid,
    /// Rule chosen at submission.
    pub approval_rule_id: Option<Uuid>,
    /// Original amount.
    pub amount: Decimal,
    /// Original currency.
    pub currency: String,
    /// Amount in the company currency.
    pub converted_amount: Decimal,
    /// Category.
    pub category: String,
    /// Description.
    pub description: Option<String>,
    /// Date incurred.
    pub expense_date: NaiveDate,
    /// Receipt location.
    pub receipt_path: Option<String>,
    /// Workflow state.
    pub state: ExpenseState,
    /// Approval records in `step_order`.
    pub records: Vec<ApprovalRecord>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

/// Approval store held in memory.
pub struct MemoryStore {
    companies: DashMap<Uuid, String>,
    rules: DashMap<Uuid, ApprovalRule>,
    expenses: DashMap<Uuid, Arc<Mutex<StoredExpense>>>,
    directory: Arc<dyn UserDirectory>,
    currency: Arc<dyn CurrencyConverter>,
    audit: Arc<dyn AuditSink>,
}

impl MemoryStore {
    /// Creates an empty store over the given collaborators.
    #[must_use]
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        currency: Arc<dyn CurrencyConverter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            companies: DashMap::new(),
            rules: DashMap::new(),
            expenses: DashMap::new(),
            directory,
            currency,
            audit,
        }
    }

    /// Registers a company and its base currency.
    pub fn add_company(&self, company_id: Uuid, currency: &str) {
        self.companies
            .insert(company_id, currency.to_ascii_uppercase());
    }

    /// Validates and stores a rule for the company.
    pub async fn create_rule(
        &self,
        company_id: Uuid,
        draft: &RuleDraft,
    ) -> Result<ApprovalRule, ApprovalError> {
        let mut members = HashSet::new();
        for user_id in referenced_users(draft) {
            if self.directory.is_company_member(user_id, company_id).await? {
                members.insert(user_id);
            }
        }

        let validated = validate_rule(draft, |id| members.contains(&id))?;
        let rule = ApprovalRule {
            id: Uuid::new_v4(),
            company_id,
            name: validated.name,
            is_active: true,
            is_manager_approver: validated.is_manager_approver,
            kind: validated.kind,
            steps: validated.steps,
        };
        self.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    /// Toggles a rule's active flag.
    pub fn set_rule_active(
        &self,
        company_id: Uuid,
        rule_id: Uuid,
        is_active: bool,
    ) -> Result<(), ApprovalError> {
        let mut rule = self
            .rules
            .get_mut(&rule_id)
            .filter(|r| r.company_id == company_id)
            .ok_or(ApprovalError::RuleNotFound(rule_id))?;
        rule.is_active = is_active;
        Ok(())
    }

    /// Submits an expense and materializes its approver chain.
    pub async fn submit_expense(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        draft: &ExpenseDraft,
    ) -> Result<Submission, ApprovalError> {
        let expense = validate_draft(draft)?;

        let rule = match expense.approval_rule_id {
            Some(rule_id) => Some(
                self.rules
                    .get(&rule_id)
                    .filter(|r| r.company_id == company_id && r.is_active)
                    .map(|r| r.value().clone())
                    .ok_or(ApprovalError::RuleNotFound(rule_id))?,
            ),
            None => None,
        };

        let company_currency = self
            .companies
            .get(&company_id)
            .map(|c| c.value().clone())
            .ok_or_else(|| ApprovalError::Validation(format!("Unknown company {company_id}")))?;

        let converted_amount = self
            .currency
            .convert(expense.amount, &expense.currency, &company_currency)
            .await?;

        let manager_id = self.directory.manager_of(employee_id).await?;
        let chain = ChainBuilder::build(manager_id, rule.as_ref());
        let current_step = ChainBuilder::initial_step(&chain);

        let now = Utc::now();
        let expense_id = Uuid::new_v4();
        let category = expense.category.clone();
        let stored = StoredExpense {
            id: expense_id,
            company_id,
            employee_id,
            approval_rule_id: expense.approval_rule_id,
            amount: expense.amount,
            currency: expense.currency,
            converted_amount,
            category: expense.category,
            description: expense.description,
            expense_date: expense.expense_date,
            receipt_path: expense.receipt_path,
            state: ExpenseState {
                id: expense_id,
                status: ExpenseStatus::Pending,
                current_step,
            },
            records: ChainBuilder::pending_records(&chain),
            created_at: now,
            updated_at: now,
        };

        self.expenses
            .insert(expense_id, Arc::new(Mutex::new(stored)));
        self.audit
            .record(AuditEntry::created(expense_id, employee_id, &category, now));

        Ok(Submission {
            expense_id,
            approval_gate: ApprovalGate::for_chain(&chain),
            chain,
            current_step,
            converted_amount,
        })
    }

    /// Applies one approver action.
    ///
    /// The expense's lock is held from the read of its ledger until the
    /// outcome is written back.
    pub async fn decide(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
        approver_id: Uuid,
        action: &str,
        comment: Option<&str>,
    ) -> Result<DecisionSummary, ApprovalError> {
        let handle = self
            .expenses
            .get(&expense_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(ApprovalError::ExpenseNotFound(expense_id))?;

        let mut expense = handle.lock().await;
        if expense.company_id != company_id {
            return Err(ApprovalError::ExpenseNotFound(expense_id));
        }

        let action: Action = action.parse()?;
        let kind = expense
            .approval_rule_id
            .and_then(|id| self.rules.get(&id).map(|r| r.kind));

        let now = Utc::now();
        let outcome = DecisionEngine::decide(
            &expense.state,
            kind.as_ref(),
            &expense.records,
            &ActionRequest {
                approver_id,
                action,
                comment,
                at: now,
            },
        )?;

        if outcome.appended {
            expense.records.push(outcome.record.clone());
        } else if let Some(record) = expense
            .records
            .iter_mut()
            .find(|r| r.id == outcome.record.id)
        {
            *record = outcome.record.clone();
        }
        expense.state = outcome.expense;
        expense.updated_at = now;
        drop(expense);

        self.audit.record(AuditEntry::decision(
            expense_id,
            approver_id,
            action,
            comment,
            now,
        ));

        Ok(DecisionSummary::from_outcome(&outcome))
    }

    /// Snapshot of an expense in the company.
    pub async fn expense(
        &self,
        company_id: Uuid,
        expense_id: Uuid,
    ) -> Result<StoredExpense, ApprovalError> {
        let handle = self
            .expenses
            .get(&expense_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(ApprovalError::ExpenseNotFound(expense_id))?;
        let expense = handle.lock().await;
        if expense.company_id == company_id {
            Ok(expense.clone())
        } else {
            Err(ApprovalError::ExpenseNotFound(expense_id))
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
