//! Expense submission, listing and decision routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use claimflow_core::approval::ExpenseStatus;
use claimflow_core::expense::ExpenseDraft;
use claimflow_db::repositories::ExpenseFilter;
use claimflow_db::{ApprovalRepository, ExpenseRepository};
use claimflow_shared::Role;
use claimflow_shared::types::PageRequest;

use crate::{
    AppState,
    error::{approval_error_response, bad_request, forbidden},
    middleware::AuthUser,
};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_company_expenses).post(submit_expense))
        .route("/expenses/mine", get(list_my_expenses))
        .route("/expenses/pending-approvals", get(list_pending_approvals))
        .route("/expenses/{expense_id}", get(get_expense))
        .route("/expenses/{expense_id}/decision", post(decide_expense))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for expense listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListExpensesQuery {
    /// Status filter: pending, approved or rejected.
    pub status: Option<String>,
    /// Employee filter, company listing only.
    pub employee_id: Option<Uuid>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

impl ListExpensesQuery {
    fn status(&self) -> Result<Option<ExpenseStatus>, Response> {
        self.status
            .as_deref()
            .map(|s| {
                ExpenseStatus::parse(s).ok_or_else(|| bad_request(format!("Invalid status '{s}'")))
            })
            .transpose()
    }

    fn page(&self) -> PageRequest {
        PageRequest::from_query(self.page, self.per_page)
    }
}

/// Request body for an approver decision.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// `approve` or `reject`.
    pub action: String,
    /// Required when rejecting.
    pub comments: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/expenses` - Submit an expense.
async fn submit_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(draft): Json<ExpenseDraft>,
) -> impl IntoResponse {
    let repo = ExpenseRepository::new((*state.db).clone());
    match repo
        .submit_expense(
            auth.company_id(),
            auth.user_id(),
            &draft,
            state.currency.as_ref(),
            state.audit.as_ref(),
        )
        .await
    {
        Ok(submission) => (StatusCode::CREATED, Json(submission)).into_response(),
        Err(e) => approval_error_response(&e),
    }
}

/// GET `/expenses/mine` - The caller's expenses.
async fn list_my_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListExpensesQuery>,
) -> impl IntoResponse {
    let status = match query.status() {
        Ok(status) => status,
        Err(response) => return response,
    };

    let repo = ExpenseRepository::new((*state.db).clone());
    match repo
        .list_mine(auth.company_id(), auth.user_id(), status, &query.page())
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => approval_error_response(&e),
    }
}

/// GET `/expenses` - All company expenses (admin).
async fn list_company_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListExpensesQuery>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }
    let status = match query.status() {
        Ok(status) => status,
        Err(response) => return response,
    };

    let filter = ExpenseFilter {
        status,
        employee_id: query.employee_id,
    };
    let repo = ExpenseRepository::new((*state.db).clone());
    match repo
        .list_for_company(auth.company_id(), filter, &query.page())
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => approval_error_response(&e),
    }
}

/// GET `/expenses/pending-approvals` - The caller's approval inbox.
async fn list_pending_approvals(
    State(state): State<AppState>,
    auth: AuthUser,
) -> impl IntoResponse {
    let repo = ExpenseRepository::new((*state.db).clone());
    match repo
        .pending_for_approver(auth.company_id(), auth.user_id())
        .await
    {
        Ok(items) => (StatusCode::OK, Json(json!({ "data": items }))).into_response(),
        Err(e) => approval_error_response(&e),
    }
}

/// GET `/expenses/{expense_id}` - Expense with ledger and audit trail.
async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = ExpenseRepository::new((*state.db).clone());
    match repo.get_detail(auth.company_id(), expense_id).await {
        Ok(detail) if detail.is_visible_to(auth.user_id(), auth.is_admin()) => {
            (StatusCode::OK, Json(detail)).into_response()
        }
        Ok(_) => forbidden("Only the submitter, its approvers and admins may view this expense"),
        Err(e) => approval_error_response(&e),
    }
}

/// POST `/expenses/{expense_id}/decision` - Approve or reject.
async fn decide_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> impl IntoResponse {
    let repo = ApprovalRepository::new((*state.db).clone());
    match repo
        .decide(
            auth.company_id(),
            expense_id,
            auth.user_id(),
            &payload.action,
            payload.comments.as_deref(),
            state.audit.as_ref(),
        )
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => approval_error_response(&e),
    }
}
