//! Approval rule repository.
//!
//! The rule store: rules and their ordered steps, created in one transaction.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use claimflow_core::approval::{
    ApprovalError, ApprovalRule, RuleDraft, referenced_users, validate_rule,
};

use crate::entities::{approval_rules, approval_steps};

use super::convert::{db_error, rule_to_core, rule_type_to_db, step_to_db};
use super::user::members_among;

/// A rule row with its steps in `step_order`.
#[derive(Debug, Clone, Serialize)]
pub struct RuleWithSteps {
    /// The rule.
    #[serde(flatten)]
    pub rule: approval_rules::Model,
    /// Ordered steps.
    pub steps: Vec<approval_steps::Model>,
}

impl RuleWithSteps {
    /// Converts the rows into the core rule.
    ///
    /// # Errors
    ///
    /// Returns `LedgerInvariant` if the stored columns do not form a valid rule.
    pub fn to_core(&self) -> Result<ApprovalRule, ApprovalError> {
        rule_to_core(&self.rule, &self.steps)
    }
}

/// Repository for approval rule operations.
#[derive(Debug, Clone)]
pub struct ApprovalRuleRepository {
    db: DatabaseConnection,
}

impl ApprovalRuleRepository {
    /// Creates a new approval rule repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Validates a draft and stores the rule with its steps.
    ///
    /// # Errors
    ///
    /// Returns `Validation` or `InvalidApprover` for a bad draft, or
    /// `Database` if the insert fails. Nothing is written on error.
    pub async fn create_rule(
        &self,
        company_id: Uuid,
        draft: &RuleDraft,
    ) -> Result<RuleWithSteps, ApprovalError> {
        let members = members_among(&self.db, company_id, &referenced_users(draft))
            .await
            .map_err(db_error)?;
        let validated = validate_rule(draft, |id| members.contains(&id))?;

        let now = Utc::now().into();
        let rule_id = Uuid::new_v4();

        let txn = self.db.begin().await.map_err(db_error)?;

        let rule = approval_rules::ActiveModel {
            id: Set(rule_id),
            company_id: Set(company_id),
            rule_name: Set(validated.name),
            is_manager_approver: Set(validated.is_manager_approver),
            rule_type: Set(rule_type_to_db(validated.kind.rule_type())),
            percentage_threshold: Set(validated.kind.threshold().map(i32::from)),
            specific_approver_id: Set(validated.kind.specific_approver()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;

        let mut steps = Vec::with_capacity(validated.steps.len());
        for step in &validated.steps {
            let model = approval_steps::ActiveModel {
                id: Set(Uuid::new_v4()),
                approval_rule_id: Set(rule_id),
                step_order: Set(step_to_db(step.step_order)?),
                approver_id: Set(step.approver_id),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(db_error)?;
            steps.push(model);
        }

        txn.commit().await.map_err(db_error)?;

        info!(
            rule_id = %rule_id,
            company_id = %company_id,
            rule_type = validated.kind.rule_type().as_str(),
            steps = steps.len(),
            "Approval rule created"
        );

        Ok(RuleWithSteps { rule, steps })
    }

    /// Lists the company's active rules, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Database` if a query fails.
    pub async fn list_rules(&self, company_id: Uuid) -> Result<Vec<RuleWithSteps>, ApprovalError> {
        let rules = approval_rules::Entity::find()
            .filter(approval_rules::Column::CompanyId.eq(company_id))
            .filter(approval_rules::Column::IsActive.eq(true))
            .order_by_desc(approval_rules::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        if rules.is_empty() {
            return Ok(Vec::new());
        }

        let steps = approval_steps::Entity::find()
            .filter(approval_steps::Column::ApprovalRuleId.is_in(rules.iter().map(|r| r.id)))
            .order_by_asc(approval_steps::Column::StepOrder)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let mut by_rule: HashMap<Uuid, Vec<approval_steps::Model>> = HashMap::new();
        for step in steps {
            by_rule.entry(step.approval_rule_id).or_default().push(step);
        }

        Ok(rules
            .into_iter()
            .map(|rule| RuleWithSteps {
                steps: by_rule.remove(&rule.id).unwrap_or_default(),
                rule,
            })
            .collect())
    }

    /// Gets a rule of the company, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RuleNotFound` if the rule does not exist in the company.
    pub async fn get_rule(
        &self,
        company_id: Uuid,
        rule_id: Uuid,
    ) -> Result<RuleWithSteps, ApprovalError> {
        let rule = approval_rules::Entity::find_by_id(rule_id)
            .filter(approval_rules::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or(ApprovalError::RuleNotFound(rule_id))?;

        let steps = find_steps(&self.db, rule_id).await?;
        Ok(RuleWithSteps { rule, steps })
    }

    /// Activates or deactivates a rule.
    ///
    /// Expenses already created keep their chain.
    ///
    /// # Errors
    ///
    /// Returns `RuleNotFound` if the rule does not exist in the company.
    pub async fn set_active(
        &self,
        company_id: Uuid,
        rule_id: Uuid,
        is_active: bool,
    ) -> Result<RuleWithSteps, ApprovalError> {
        let existing = self.get_rule(company_id, rule_id).await?;

        let mut active: approval_rules::ActiveModel = existing.rule.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().into());
        let rule = active.update(&self.db).await.map_err(db_error)?;

        info!(rule_id = %rule_id, is_active, "Approval rule toggled");

        Ok(RuleWithSteps {
            rule,
            steps: existing.steps,
        })
    }
}

async fn find_steps<C: ConnectionTrait>(
    conn: &C,
    rule_id: Uuid,
) -> Result<Vec<approval_steps::Model>, ApprovalError> {
    approval_steps::Entity::find()
        .filter(approval_steps::Column::ApprovalRuleId.eq(rule_id))
        .order_by_asc(approval_steps::Column::StepOrder)
        .all(conn)
        .await
        .map_err(db_error)
}

/// Loads a rule as a core value.
///
/// With `active_only`, an inactive rule is treated as missing.
pub(crate) async fn load_rule<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    rule_id: Uuid,
    active_only: bool,
) -> Result<Option<ApprovalRule>, ApprovalError> {
    let mut query = approval_rules::Entity::find_by_id(rule_id)
        .filter(approval_rules::Column::CompanyId.eq(company_id));
    if active_only {
        query = query.filter(approval_rules::Column::IsActive.eq(true));
    }

    let Some(rule) = query.one(conn).await.map_err(db_error)? else {
        return Ok(None);
    };
    let steps = find_steps(conn, rule_id).await?;
    rule_to_core(&rule, &steps).map(Some)
}
