use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::inspection_dto::{
    CreateInspectionRequest, GidioniResponse, InspectionResponse, SaveChecklistsRequest,
    SaveSellerInfoRequest, VerifyGidioniRequest, VerifyRamaRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::OptionalJson;
use crate::models::{Actor, StatusHistoryEntry};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_inspection_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_inspection))
        .route("/:id", get(get_inspection))
        .route("/:id/seller-info", put(save_seller_info))
        .route("/:id/verify-rama", post(verify_rama))
        .route("/:id/checklists", put(save_checklists))
        .route("/:id/verify-gidioni", post(verify_gidioni))
        .route("/:id/history", get(inspection_history))
}

async fn create_inspection(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateInspectionRequest>,
) -> Result<Json<ApiResponse<InspectionResponse>>, AppError> {
    request.validate()?;
    let inspection = state
        .inspections
        .create(&actor, request.motorcycle_id, request.contract_id, request.customer_id)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        InspectionResponse::for_role(inspection, Some(actor.role)),
        "Inspection created",
    )))
}

// Sin cabeceras de actor se devuelve el estado almacenado
async fn get_inspection(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InspectionResponse>>, AppError> {
    let inspection = state.inspections.get(id).await?;
    Ok(Json(ApiResponse::success(InspectionResponse::for_role(
        inspection,
        actor.map(|a| a.role),
    ))))
}

async fn save_seller_info(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<SaveSellerInfoRequest>,
) -> Result<Json<ApiResponse<InspectionResponse>>, AppError> {
    request.validate()?;
    let inspection = state
        .inspections
        .save_seller_info(&actor, id, request.seller_information, request.expected_status)
        .await?;
    Ok(Json(ApiResponse::success(InspectionResponse::for_role(
        inspection,
        Some(actor.role),
    ))))
}

async fn verify_rama(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<VerifyRamaRequest>,
) -> Result<Json<ApiResponse<InspectionResponse>>, AppError> {
    request.validate()?;
    let inspection = state
        .inspections
        .verify_rama(&actor, id, request.seller_information, request.expected_status)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        InspectionResponse::for_role(inspection, Some(actor.role)),
        "RAMA phase verified",
    )))
}

async fn save_checklists(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<SaveChecklistsRequest>,
) -> Result<Json<ApiResponse<InspectionResponse>>, AppError> {
    request.validate()?;
    let inspection = state
        .inspections
        .save_checklists(&actor, id, request.checklists, request.expected_status)
        .await?;
    Ok(Json(ApiResponse::success(InspectionResponse::for_role(
        inspection,
        Some(actor.role),
    ))))
}

async fn verify_gidioni(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<VerifyGidioniRequest>,
) -> Result<Json<ApiResponse<GidioniResponse>>, AppError> {
    request.validate()?;
    let outcome = state
        .inspections
        .verify_gidioni(
            &actor,
            id,
            request.checklists,
            request.spawn_repair,
            request.mechanic_id,
            request.expected_status,
        )
        .await?;

    let message = if outcome.spawned_repair.is_some() {
        "GIDIONI phase verified, repair opened for failed items"
    } else {
        "GIDIONI phase verified"
    };
    Ok(Json(ApiResponse::success_with_message(
        GidioniResponse::from(outcome),
        message,
    )))
}

async fn inspection_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<StatusHistoryEntry>>>, AppError> {
    state.inspections.get(id).await?;
    let history = state.store.history(id).await?;
    Ok(Json(ApiResponse::success(history)))
}
