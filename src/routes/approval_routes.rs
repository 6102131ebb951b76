use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::dto::approval_dto::{
    ApprovalDecisionRequest, ApprovalListQuery, RejectApprovalRequest, StaleApprovalsQuery,
    SubmitApprovalRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::OptionalJson;
use crate::models::{Actor, ApprovalRequest, StatusHistoryEntry};
use crate::state::AppState;
use crate::utils::errors::{validation_error, AppError};

pub fn create_approval_router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_approval))
        .route("/", get(list_approvals))
        .route("/stale", get(stale_approvals))
        .route("/:id", get(get_approval))
        .route("/:id/sales-approve", post(sales_approve))
        .route("/:id/admin-approve", post(admin_approve))
        .route("/:id/reject", post(reject_approval))
        .route("/:id/history", get(approval_history))
}

async fn submit_approval(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<SubmitApprovalRequest>,
) -> Result<Json<ApiResponse<ApprovalRequest>>, AppError> {
    request.validate()?;
    let approval = state
        .approvals
        .submit(&actor, request.approval_type, request.proposed_data, request.priority)
        .await?;
    Ok(Json(ApiResponse::success_with_message(approval, "Approval request submitted")))
}

async fn list_approvals(
    State(state): State<AppState>,
    Query(query): Query<ApprovalListQuery>,
) -> Result<Json<ApiResponse<Vec<ApprovalRequest>>>, AppError> {
    let approvals = state.approvals.list(query.status).await?;
    Ok(Json(ApiResponse::success(approvals)))
}

async fn stale_approvals(
    State(state): State<AppState>,
    Query(query): Query<StaleApprovalsQuery>,
) -> Result<Json<ApiResponse<Vec<ApprovalRequest>>>, AppError> {
    query.validate()?;
    let threshold = query
        .hours
        .map(|hours| {
            Duration::try_hours(hours)
                .ok_or_else(|| validation_error("hours", "threshold out of range"))
        })
        .transpose()?;
    let approvals = state.approvals.stale_requests(threshold).await?;
    Ok(Json(ApiResponse::success(approvals)))
}

async fn get_approval(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApprovalRequest>>, AppError> {
    let approval = state.approvals.get(id).await?;
    Ok(Json(ApiResponse::success(approval)))
}

async fn sales_approve(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<ApprovalDecisionRequest>,
) -> Result<Json<ApiResponse<ApprovalRequest>>, AppError> {
    request.validate()?;
    let approval = state
        .approvals
        .sales_approve(&actor, id, request.comments, request.expected_status)
        .await?;
    Ok(Json(ApiResponse::success_with_message(approval, "Approved by sales")))
}

async fn admin_approve(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<ApprovalDecisionRequest>,
) -> Result<Json<ApiResponse<ApprovalRequest>>, AppError> {
    request.validate()?;
    let approval = state
        .approvals
        .admin_approve(&actor, id, request.comments, request.expected_status)
        .await?;
    Ok(Json(ApiResponse::success_with_message(approval, "Approved and applied")))
}

async fn reject_approval(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectApprovalRequest>,
) -> Result<Json<ApiResponse<ApprovalRequest>>, AppError> {
    request.validate()?;
    let approval = state
        .approvals
        .reject(&actor, id, &request.reason, request.expected_status)
        .await?;
    Ok(Json(ApiResponse::success_with_message(approval, "Approval request rejected")))
}

async fn approval_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<StatusHistoryEntry>>>, AppError> {
    state.approvals.get(id).await?;
    let history = state.store.history(id).await?;
    Ok(Json(ApiResponse::success(history)))
}
