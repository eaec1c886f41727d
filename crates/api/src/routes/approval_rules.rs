//! Approval rule management routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use claimflow_core::approval::RuleDraft;
use claimflow_db::ApprovalRuleRepository;
use claimflow_shared::Role;

use crate::{AppState, error::approval_error_response, middleware::AuthUser};

/// Creates the approval rules routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/approval-rules",
            get(list_approval_rules).post(create_approval_rule),
        )
        .route(
            "/approval-rules/{rule_id}",
            get(get_approval_rule).patch(update_approval_rule),
        )
}

/// Request body for toggling a rule.
#[derive(Debug, Deserialize)]
pub struct UpdateApprovalRuleRequest {
    /// New active flag.
    pub is_active: bool,
}

/// POST `/approval-rules` - Create approval rule.
async fn create_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(draft): Json<RuleDraft>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let repo = ApprovalRuleRepository::new((*state.db).clone());
    match repo.create_rule(auth.company_id(), &draft).await {
        Ok(rule) => (StatusCode::CREATED, Json(rule)).into_response(),
        Err(e) => approval_error_response(&e),
    }
}

/// GET `/approval-rules` - List active rules, newest first.
async fn list_approval_rules(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin, Role::Manager]) {
        return response;
    }

    let repo = ApprovalRuleRepository::new((*state.db).clone());
    match repo.list_rules(auth.company_id()).await {
        Ok(rules) => (StatusCode::OK, Json(json!({ "data": rules }))).into_response(),
        Err(e) => approval_error_response(&e),
    }
}

/// GET `/approval-rules/{rule_id}` - Get one rule with its steps.
async fn get_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rule_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin, Role::Manager]) {
        return response;
    }

    let repo = ApprovalRuleRepository::new((*state.db).clone());
    match repo.get_rule(auth.company_id(), rule_id).await {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(e) => approval_error_response(&e),
    }
}

/// PATCH `/approval-rules/{rule_id}` - Activate or deactivate a rule.
async fn update_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rule_id): Path<Uuid>,
    Json(payload): Json<UpdateApprovalRuleRequest>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let repo = ApprovalRuleRepository::new((*state.db).clone());
    match repo
        .set_active(auth.company_id(), rule_id, payload.is_active)
        .await
    {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(e) => approval_error_response(&e),
    }
}
