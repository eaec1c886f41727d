//! Integration tests for rule creation, submission and decisions on Postgres.

#![allow(clippy::too_many_lines)]

mod common;

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use uuid::Uuid;

use claimflow_core::approval::{
    ApprovalError, ApprovalGate, AuditAction, ChainLink, Decision, ExpenseStatus,
    MemoryAuditSink, RuleDraft, UserDirectory,
};
use claimflow_core::currency::StaticRates;
use claimflow_core::expense::ExpenseDraft;
use claimflow_db::entities::sea_orm_active_enums;
use claimflow_db::repositories::{
    ApprovalRepository, ApprovalRuleRepository, AuditLogRepository, DbAuditSink, ExpenseFilter,
    ExpenseRepository, UserRepository,
};
use claimflow_shared::types::PageRequest;

use common::{connect, rule, seed};

fn expense(rule_id: Option<Uuid>) -> ExpenseDraft {
    ExpenseDraft {
        amount: dec!(120.00),
        currency: "usd".to_string(),
        category: "Travel".to_string(),
        description: Some("Client visit".to_string()),
        expense_date: NaiveDate::from_ymd_opt(2026, 3, 14),
        receipt_path: None,
        approval_rule_id: rule_id,
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_percentage_rule_with_manager_only() {
    let db = connect().await;
    let fx = seed(&db).await;
    let audit = MemoryAuditSink::new();
    let rates = StaticRates::new();

    let rules = ApprovalRuleRepository::new(db.clone());
    let created = rules
        .create_rule(
            fx.company_id,
            &RuleDraft {
                percentage_threshold: Some(60),
                ..rule("percentage")
            },
        )
        .await
        .unwrap();
    assert!(created.steps.is_empty());
    assert!(created.rule.is_manager_approver);

    let submission = ExpenseRepository::new(db.clone())
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &expense(Some(created.rule.id)),
            &rates,
            &audit,
        )
        .await
        .unwrap();
    assert_eq!(
        submission.chain,
        vec![ChainLink {
            approver_id: fx.manager_id,
            step_order: 1
        }]
    );
    assert_eq!(submission.converted_amount, dec!(120.00));

    let summary = ApprovalRepository::new(db.clone())
        .decide(
            fx.company_id,
            submission.expense_id,
            fx.manager_id,
            "approve",
            None,
            &audit,
        )
        .await
        .unwrap();
    assert_eq!(summary.status, ExpenseStatus::Approved);
    assert_eq!(
        summary.decision,
        Decision::PercentageThreshold {
            approved: 1,
            total: 1
        }
    );

    let actions: Vec<_> = audit
        .entries_for(submission.expense_id)
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec![AuditAction::Created, AuditAction::Approve]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_sequential_rule_advances_by_lowest_pending_step() {
    let db = connect().await;
    let fx = seed(&db).await;
    let audit = MemoryAuditSink::new();
    let (a, b, c) = (fx.approvers[0], fx.approvers[1], fx.approvers[2]);

    let created = ApprovalRuleRepository::new(db.clone())
        .create_rule(
            fx.company_id,
            &RuleDraft {
                is_manager_approver: Some(false),
                approvers: vec![a, b, c],
                ..rule("sequential")
            },
        )
        .await
        .unwrap();

    let submission = ExpenseRepository::new(db.clone())
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &expense(Some(created.rule.id)),
            &StaticRates::new(),
            &audit,
        )
        .await
        .unwrap();
    assert_eq!(submission.current_step, Some(1));

    let approvals = ApprovalRepository::new(db.clone());
    let after_a = approvals
        .decide(fx.company_id, submission.expense_id, a, "approve", None, &audit)
        .await
        .unwrap();
    assert_eq!(after_a.current_step, Some(2));

    let after_c = approvals
        .decide(fx.company_id, submission.expense_id, c, "approve", None, &audit)
        .await
        .unwrap();
    assert_eq!(after_c.status, ExpenseStatus::Pending);
    assert_eq!(after_c.current_step, Some(2));

    let after_b = approvals
        .decide(fx.company_id, submission.expense_id, b, "approve", None, &audit)
        .await
        .unwrap();
    assert_eq!(after_b.status, ExpenseStatus::Approved);
    assert_eq!(after_b.decision, Decision::SequentialComplete);

    let again = approvals
        .decide(fx.company_id, submission.expense_id, a, "approve", None, &audit)
        .await;
    assert!(matches!(
        again,
        Err(ApprovalError::ExpenseNotPending {
            status: ExpenseStatus::Approved
        })
    ));

    let detail = ExpenseRepository::new(db.clone())
        .get_detail(fx.company_id, submission.expense_id)
        .await
        .unwrap();
    assert_eq!(detail.expense.status, sea_orm_active_enums::ExpenseStatus::Approved);
    assert!(
        detail
            .approvals
            .iter()
            .all(|r| r.status == sea_orm_active_enums::ApprovalStatus::Approved)
    );
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_reject_requires_comment_and_finalizes() {
    let db = connect().await;
    let fx = seed(&db).await;
    let audit = MemoryAuditSink::new();

    let submission = ExpenseRepository::new(db.clone())
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &expense(None),
            &StaticRates::new(),
            &audit,
        )
        .await
        .unwrap();

    let approvals = ApprovalRepository::new(db.clone());
    let blank = approvals
        .decide(
            fx.company_id,
            submission.expense_id,
            fx.manager_id,
            "reject",
            Some("   "),
            &audit,
        )
        .await;
    assert!(matches!(blank, Err(ApprovalError::RejectCommentRequired)));

    let summary = approvals
        .decide(
            fx.company_id,
            submission.expense_id,
            fx.manager_id,
            "reject",
            Some("Missing receipt"),
            &audit,
        )
        .await
        .unwrap();
    assert_eq!(summary.status, ExpenseStatus::Rejected);
    assert_eq!(summary.decision, Decision::Rejected);

    let detail = ExpenseRepository::new(db.clone())
        .get_detail(fx.company_id, submission.expense_id)
        .await
        .unwrap();
    assert_eq!(detail.approvals[0].comments.as_deref(), Some("Missing receipt"));
    assert!(detail.approvals[0].approved_at.is_some());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_unassigned_expense_and_unknown_approver() {
    let db = connect().await;
    let fx = seed(&db).await;
    let audit = MemoryAuditSink::new();

    // approvers[0] has no manager
    let submission = ExpenseRepository::new(db.clone())
        .submit_expense(
            fx.company_id,
            fx.approvers[0],
            &expense(None),
            &StaticRates::new(),
            &audit,
        )
        .await
        .unwrap();
    assert!(submission.chain.is_empty());
    assert_eq!(submission.current_step, None);
    assert_eq!(submission.approval_gate, ApprovalGate::Unassigned);

    let result = ApprovalRepository::new(db.clone())
        .decide(
            fx.company_id,
            submission.expense_id,
            fx.manager_id,
            "approve",
            None,
            &audit,
        )
        .await;
    assert!(matches!(result, Err(ApprovalError::NotAssigned { .. })));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_inactive_rule_rejected_at_submission() {
    let db = connect().await;
    let fx = seed(&db).await;
    let rules = ApprovalRuleRepository::new(db.clone());

    let created = rules
        .create_rule(
            fx.company_id,
            &RuleDraft {
                specific_approver_id: Some(fx.approvers[0]),
                ..rule("specific_approver")
            },
        )
        .await
        .unwrap();
    let toggled = rules
        .set_active(fx.company_id, created.rule.id, false)
        .await
        .unwrap();
    assert!(!toggled.rule.is_active);

    let listed = rules.list_rules(fx.company_id).await.unwrap();
    assert!(listed.iter().all(|r| r.rule.id != created.rule.id));

    let result = ExpenseRepository::new(db.clone())
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &expense(Some(created.rule.id)),
            &StaticRates::new(),
            &MemoryAuditSink::new(),
        )
        .await;
    assert!(matches!(result, Err(ApprovalError::RuleNotFound(id)) if id == created.rule.id));

    let other_company = rules.get_rule(Uuid::new_v4(), created.rule.id).await;
    assert!(matches!(other_company, Err(ApprovalError::RuleNotFound(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_rule_with_outside_approver_is_not_stored() {
    let db = connect().await;
    let fx = seed(&db).await;
    let outsider = Uuid::new_v4();

    let result = ApprovalRuleRepository::new(db.clone())
        .create_rule(
            fx.company_id,
            &RuleDraft {
                approvers: vec![fx.approvers[0], outsider],
                ..rule("sequential")
            },
        )
        .await;
    assert!(matches!(result, Err(ApprovalError::InvalidApprover(id)) if id == outsider));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_currency_conversion_and_failure() {
    let db = connect().await;
    let fx = seed(&db).await;
    let audit = MemoryAuditSink::new();
    let expenses = ExpenseRepository::new(db.clone());
    let rates = StaticRates::new().with_rate("EUR", "USD", dec!(1.085));

    let submission = expenses
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &ExpenseDraft {
                amount: dec!(100.00),
                currency: "EUR".to_string(),
                ..expense(None)
            },
            &rates,
            &audit,
        )
        .await
        .unwrap();
    assert_eq!(submission.converted_amount, dec!(108.50));

    let failed = expenses
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &ExpenseDraft {
                currency: "JPY".to_string(),
                ..expense(None)
            },
            &rates,
            &audit,
        )
        .await;
    assert!(matches!(failed, Err(ApprovalError::Currency(_))));

    let mine = expenses
        .list_mine(fx.company_id, fx.employee_id, None, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(mine.meta.total, 1);
    assert_eq!(mine.data[0].expense.id, submission.expense_id);
    assert_eq!(mine.data[0].approvals.len(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_pending_inbox_and_company_listing() {
    let db = connect().await;
    let fx = seed(&db).await;
    let audit = MemoryAuditSink::new();
    let expenses = ExpenseRepository::new(db.clone());

    let submission = expenses
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &expense(None),
            &StaticRates::new(),
            &audit,
        )
        .await
        .unwrap();

    let inbox = expenses
        .pending_for_approver(fx.company_id, fx.manager_id)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].expense.id, submission.expense_id);
    assert!(inbox[0].is_current_step);

    let pending = expenses
        .list_for_company(
            fx.company_id,
            ExpenseFilter {
                status: Some(ExpenseStatus::Pending),
                employee_id: None,
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(pending.meta.total, 1);

    ApprovalRepository::new(db.clone())
        .decide(
            fx.company_id,
            submission.expense_id,
            fx.manager_id,
            "approve",
            None,
            &audit,
        )
        .await
        .unwrap();

    let inbox = expenses
        .pending_for_approver(fx.company_id, fx.manager_id)
        .await
        .unwrap();
    assert!(inbox.is_empty());

    let detail = expenses
        .get_detail(fx.company_id, submission.expense_id)
        .await
        .unwrap();
    assert!(detail.is_visible_to(fx.employee_id, false));
    assert!(detail.is_visible_to(fx.manager_id, false));
    assert!(!detail.is_visible_to(fx.approvers[3], false));
    assert!(detail.is_visible_to(fx.approvers[3], true));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_specific_approver_sees_expense_outside_chain() {
    let db = connect().await;
    let fx = seed(&db).await;
    let audit = MemoryAuditSink::new();
    let signer = fx.approvers[0];
    let expenses = ExpenseRepository::new(db.clone());

    let created = ApprovalRuleRepository::new(db.clone())
        .create_rule(
            fx.company_id,
            &RuleDraft {
                specific_approver_id: Some(signer),
                ..rule("specific_approver")
            },
        )
        .await
        .unwrap();

    let submission = expenses
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &expense(Some(created.rule.id)),
            &StaticRates::new(),
            &audit,
        )
        .await
        .unwrap();
    assert_eq!(
        submission.chain,
        vec![ChainLink {
            approver_id: fx.manager_id,
            step_order: 1
        }]
    );

    let detail = expenses
        .get_detail(fx.company_id, submission.expense_id)
        .await
        .unwrap();
    assert_eq!(detail.specific_approver_id, Some(signer));
    assert!(detail.is_visible_to(signer, false));
    assert!(!detail.is_visible_to(fx.approvers[1], false));

    let inbox = expenses
        .pending_for_approver(fx.company_id, signer)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].expense.id, submission.expense_id);
    assert!(inbox[0].approval.is_none());
    assert!(!inbox[0].is_current_step);

    let summary = ApprovalRepository::new(db.clone())
        .decide(
            fx.company_id,
            submission.expense_id,
            signer,
            "approve",
            None,
            &audit,
        )
        .await
        .unwrap();
    assert_eq!(summary.decision, Decision::SpecificApprover);

    let inbox = expenses
        .pending_for_approver(fx.company_id, signer)
        .await
        .unwrap();
    assert!(inbox.is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_specific_approver_on_chain_is_listed_once() {
    let db = connect().await;
    let fx = seed(&db).await;
    let signer = fx.approvers[1];
    let expenses = ExpenseRepository::new(db.clone());

    let created = ApprovalRuleRepository::new(db.clone())
        .create_rule(
            fx.company_id,
            &RuleDraft {
                percentage_threshold: Some(100),
                specific_approver_id: Some(signer),
                approvers: vec![signer],
                ..rule("hybrid")
            },
        )
        .await
        .unwrap();

    let submission = expenses
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &expense(Some(created.rule.id)),
            &StaticRates::new(),
            &MemoryAuditSink::new(),
        )
        .await
        .unwrap();

    let inbox = expenses
        .pending_for_approver(fx.company_id, signer)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].expense.id, submission.expense_id);
    let record = inbox[0].approval.as_ref().unwrap();
    assert_eq!(record.step_order, 2);
    assert!(!inbox[0].is_current_step);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_user_directory_resolves_manager_and_membership() {
    let db = connect().await;
    let fx = seed(&db).await;
    let other = seed(&db).await;
    let directory = UserRepository::new(db.clone());

    assert_eq!(
        directory.manager_of(fx.employee_id).await.unwrap(),
        Some(fx.manager_id)
    );
    assert_eq!(directory.manager_of(fx.manager_id).await.unwrap(), None);
    assert!(
        directory
            .is_company_member(fx.employee_id, fx.company_id)
            .await
            .unwrap()
    );
    assert!(
        !directory
            .is_company_member(fx.employee_id, other.company_id)
            .await
            .unwrap()
    );

    let result = ExpenseRepository::new(db.clone())
        .submit_expense(
            other.company_id,
            fx.employee_id,
            &expense(None),
            &StaticRates::new(),
            &MemoryAuditSink::new(),
        )
        .await;
    assert!(matches!(result, Err(ApprovalError::Validation(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_db_audit_sink_writes_entries() {
    let db = connect().await;
    let fx = seed(&db).await;
    let sink = DbAuditSink::new(db.clone());

    let submission = ExpenseRepository::new(db.clone())
        .submit_expense(
            fx.company_id,
            fx.employee_id,
            &expense(None),
            &StaticRates::new(),
            &sink,
        )
        .await
        .unwrap();

    let logs = AuditLogRepository::new(db.clone());
    let mut entries = Vec::new();
    for _ in 0..50 {
        entries = logs.list_for_expense(submission.expense_id).await.unwrap();
        if !entries.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "CREATED");
    assert_eq!(entries[0].details, "Expense created for Travel");
}
