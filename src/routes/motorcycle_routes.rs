use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::motorcycle_dto::{RegisterMotorcycleRequest, SetSalePriceRequest};
use crate::dto::ApiResponse;
use crate::models::{Actor, Inspection, Motorcycle, Repair, StatusHistoryEntry};
use crate::services::{InvariantReport, PriceInput};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_motorcycle_router() -> Router<AppState> {
    Router::new()
        .route("/", post(register_motorcycle))
        .route("/", get(list_motorcycles))
        .route("/:id", get(get_motorcycle))
        .route("/:id/invariants", get(check_invariants))
        .route("/:id/history", get(motorcycle_history))
        .route("/:id/price", post(set_sale_price))
        .route("/:id/repairs", get(list_repairs))
        .route("/:id/inspections", get(list_inspections))
}

async fn register_motorcycle(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<RegisterMotorcycleRequest>,
) -> Result<Json<ApiResponse<Motorcycle>>, AppError> {
    request.validate()?;
    let (details, acquisition_cost) = request.into_parts();
    let moto = state
        .motorcycles
        .register(&actor, details, acquisition_cost)
        .await?;
    Ok(Json(ApiResponse::success_with_message(moto, "Motorcycle registered")))
}

async fn list_motorcycles(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Motorcycle>>>, AppError> {
    let motos = state.motorcycles.list().await?;
    Ok(Json(ApiResponse::success(motos)))
}

async fn get_motorcycle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Motorcycle>>, AppError> {
    let moto = state.motorcycles.get(id).await?;
    Ok(Json(ApiResponse::success(moto)))
}

async fn check_invariants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvariantReport>>, AppError> {
    let report = state.motorcycles.invariants(id).await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn motorcycle_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<StatusHistoryEntry>>>, AppError> {
    state.motorcycles.get(id).await?;
    let history = state.store.history(id).await?;
    Ok(Json(ApiResponse::success(history)))
}

async fn set_sale_price(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<SetSalePriceRequest>,
) -> Result<Json<ApiResponse<Motorcycle>>, AppError> {
    request.validate()?;
    let input = PriceInput::from_parts(request.profit_margin, request.sale_price)?;
    let moto = state
        .pricing
        .set_sale_price(&actor, id, input, request.expected_status)
        .await?;
    Ok(Json(ApiResponse::success_with_message(moto, "Sale price set")))
}

async fn list_repairs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Repair>>>, AppError> {
    let repairs = state.repairs.list_for_motorcycle(id).await?;
    Ok(Json(ApiResponse::success(repairs)))
}

async fn list_inspections(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Inspection>>>, AppError> {
    let inspections = state.inspections.list_for_motorcycle(id).await?;
    Ok(Json(ApiResponse::success(inspections)))
}
