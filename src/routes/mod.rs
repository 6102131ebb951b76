//! Rutas HTTP
//!
//! Este módulo arma el router de la API: un sub-router por entidad del
//! workflow, todos montados bajo `/api`, más el health check.

pub mod approval_routes;
pub mod bill_routes;
pub mod inspection_routes;
pub mod motorcycle_routes;
pub mod repair_routes;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::dto::ApiResponse;
use crate::middleware::cors_layer;
use crate::models::Contract;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Router completo de la aplicación con estado y capas aplicadas
pub fn create_app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/motorcycles", motorcycle_routes::create_motorcycle_router())
        .nest("/api/approvals", approval_routes::create_approval_router())
        .nest("/api/repairs", repair_routes::create_repair_router())
        .nest("/api/inspections", inspection_routes::create_inspection_router())
        .nest("/api/bills", bill_routes::create_bill_router())
        .route("/api/contracts/:id", get(get_contract))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": "moto-workflow",
        "status": "healthy",
        "environment": state.config.environment,
    }))
}

async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Contract>>, AppError> {
    let contract = state.store.require_contract(id).await?;
    Ok(Json(ApiResponse::success(contract)))
}
