use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::billing_dto::CreateBillRequest;
use crate::dto::{ApiResponse, TransitionRequest};
use crate::middleware::OptionalJson;
use crate::models::{Actor, BillStatus, RepairBill, StatusHistoryEntry};
use crate::state::AppState;
use crate::utils::errors::AppError;

type BillTransition = OptionalJson<TransitionRequest<BillStatus>>;

fn expected(body: BillTransition) -> Option<BillStatus> {
    body.0.expected_status
}

pub fn create_bill_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_bill))
        .route("/:id", get(get_bill))
        .route("/:id/send", post(send_bill))
        .route("/:id/approve-payment", post(approve_payment))
        .route("/:id/mark-paid", post(mark_paid))
        .route("/:id/history", get(bill_history))
}

async fn create_bill(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateBillRequest>,
) -> Result<Json<ApiResponse<RepairBill>>, AppError> {
    request.validate()?;
    let bill = state.billing.create_bill(&actor, request.repair_id).await?;
    Ok(Json(ApiResponse::success_with_message(bill, "Bill created")))
}

async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RepairBill>>, AppError> {
    let bill = state.billing.get(id).await?;
    Ok(Json(ApiResponse::success(bill)))
}

async fn send_bill(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    body: BillTransition,
) -> Result<Json<ApiResponse<RepairBill>>, AppError> {
    let bill = state.billing.send(&actor, id, expected(body)).await?;
    Ok(Json(ApiResponse::success_with_message(bill, "Bill sent to cashier")))
}

async fn approve_payment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    body: BillTransition,
) -> Result<Json<ApiResponse<RepairBill>>, AppError> {
    let bill = state.billing.approve_payment(&actor, id, expected(body)).await?;
    Ok(Json(ApiResponse::success_with_message(bill, "Payment approved")))
}

async fn mark_paid(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    body: BillTransition,
) -> Result<Json<ApiResponse<RepairBill>>, AppError> {
    let bill = state.billing.mark_paid(&actor, id, expected(body)).await?;
    Ok(Json(ApiResponse::success_with_message(bill, "Bill marked as paid")))
}

async fn bill_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<StatusHistoryEntry>>>, AppError> {
    state.billing.get(id).await?;
    let history = state.store.history(id).await?;
    Ok(Json(ApiResponse::success(history)))
}
