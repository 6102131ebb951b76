use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::repair_dto::{
    AssignMechanicRequest, AssignRepairRequest, CostEditRequest, DetailsRegisteredResponse,
    RegisterDetailsRequest,
};
use crate::dto::{ApiResponse, TransitionRequest};
use crate::middleware::OptionalJson;
use crate::models::{Actor, ApprovalRequest, Repair, RepairBill, RepairStatus, StatusHistoryEntry};
use crate::state::AppState;
use crate::utils::errors::AppError;

type RepairTransition = OptionalJson<TransitionRequest<RepairStatus>>;

fn expected(body: RepairTransition) -> Option<RepairStatus> {
    body.0.expected_status
}

pub fn create_repair_router() -> Router<AppState> {
    Router::new()
        .route("/", post(assign_repair))
        .route("/:id", get(get_repair))
        .route("/:id/mechanic", post(assign_mechanic))
        .route("/:id/start", post(start_work))
        .route("/:id/details", post(register_details))
        .route("/:id/cost-edit", post(request_cost_edit))
        .route("/:id/complete", post(complete_repair))
        .route("/:id/cancel", post(cancel_repair))
        .route("/:id/bills", get(list_bills))
        .route("/:id/history", get(repair_history))
}

async fn assign_repair(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<AssignRepairRequest>,
) -> Result<Json<ApiResponse<Repair>>, AppError> {
    request.validate()?;
    let repair = state
        .repairs
        .assign(&actor, request.motorcycle_id, request.mechanic_id, request.description)
        .await?;
    Ok(Json(ApiResponse::success_with_message(repair, "Repair assigned")))
}

async fn get_repair(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Repair>>, AppError> {
    let repair = state.repairs.get(id).await?;
    Ok(Json(ApiResponse::success(repair)))
}

async fn assign_mechanic(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignMechanicRequest>,
) -> Result<Json<ApiResponse<Repair>>, AppError> {
    request.validate()?;
    let repair = state
        .repairs
        .assign_mechanic(&actor, id, request.mechanic_id, request.expected_status)
        .await?;
    Ok(Json(ApiResponse::success(repair)))
}

async fn start_work(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    body: RepairTransition,
) -> Result<Json<ApiResponse<Repair>>, AppError> {
    let repair = state.repairs.start_work(&actor, id, expected(body)).await?;
    Ok(Json(ApiResponse::success_with_message(repair, "Work started")))
}

async fn register_details(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<RegisterDetailsRequest>,
) -> Result<Json<ApiResponse<DetailsRegisteredResponse>>, AppError> {
    request.validate()?;
    let (repair, approval_request) = state
        .repairs
        .register_details(
            &actor,
            id,
            request.work_items,
            request.issues_found,
            request.proof_of_work,
            request.expected_status,
        )
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        DetailsRegisteredResponse {
            repair,
            approval_request,
        },
        "Details registered, awaiting approval",
    )))
}

async fn request_cost_edit(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<CostEditRequest>,
) -> Result<Json<ApiResponse<ApprovalRequest>>, AppError> {
    request.validate()?;
    let approval = state
        .repairs
        .request_cost_edit(&actor, id, request.work_items, request.priority)
        .await?;
    Ok(Json(ApiResponse::success_with_message(approval, "Cost edit submitted for approval")))
}

async fn complete_repair(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    body: RepairTransition,
) -> Result<Json<ApiResponse<Repair>>, AppError> {
    let repair = state.repairs.complete(&actor, id, expected(body)).await?;
    Ok(Json(ApiResponse::success_with_message(repair, "Repair completed")))
}

async fn cancel_repair(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    body: RepairTransition,
) -> Result<Json<ApiResponse<Repair>>, AppError> {
    let repair = state.repairs.cancel(&actor, id, expected(body)).await?;
    Ok(Json(ApiResponse::success_with_message(repair, "Repair cancelled")))
}

async fn list_bills(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<RepairBill>>>, AppError> {
    let bills = state.billing.list_for_repair(id).await?;
    Ok(Json(ApiResponse::success(bills)))
}

async fn repair_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<StatusHistoryEntry>>>, AppError> {
    state.repairs.get(id).await?;
    let history = state.store.history(id).await?;
    Ok(Json(ApiResponse::success(history)))
}
