//! Sistema de manejo de errores
//!
//! Este módulo define la taxonomía de errores del motor de workflow
//! y su conversión a respuestas HTTP apropiadas.

use std::borrow::Cow;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Mensaje mostrado al usuario cuando la entidad ya avanzó de estado
pub const STALE_ITEM_MESSAGE: &str = "This item has already moved on, please refresh";

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    /// La precondición sobre el estado actual no se cumple
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// El rol del actor no es dueño de la transición
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Otro actor ganó la carrera (compare-and-swap perdido)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// El ejecutor de una aprobación falló; la solicitud sigue en pending_admin
    #[error("Executor failure on approval request {request_id}: {message}")]
    ExecutorFailure { request_id: Uuid, message: String },

    #[error("Missing actor identity: {0}")]
    MissingActor(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Código estable expuesto a los clientes
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::ExecutorFailure { .. } => "EXECUTOR_FAILURE",
            AppError::MissingActor(_) => "MISSING_ACTOR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Database(_) => "DB_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = Some(self.code().to_string());

        let (status, error_response) = match self {
            AppError::InvalidTransition(msg) => {
                tracing::warn!("⛔ Transición inválida: {}", msg);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: "Invalid Transition".to_string(),
                        message: STALE_ITEM_MESSAGE.to_string(),
                        details: Some(json!({ "reason": msg })),
                        code,
                    },
                )
            }

            AppError::Conflict(msg) => {
                tracing::warn!("⚔️ Conflicto de concurrencia: {}", msg);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: "Conflict".to_string(),
                        message: STALE_ITEM_MESSAGE.to_string(),
                        details: Some(json!({ "reason": msg })),
                        code,
                    },
                )
            }

            AppError::Unauthorized(msg) => {
                tracing::warn!("🔒 Acceso denegado: {}", msg);
                (
                    StatusCode::FORBIDDEN,
                    ErrorResponse {
                        error: "Unauthorized".to_string(),
                        message: format!("You do not have permission to perform this action: {}", msg),
                        details: None,
                        code,
                    },
                )
            }

            AppError::Validation(e) => {
                tracing::warn!("📝 Error de validación: {}", e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorResponse {
                        error: "Validation Error".to_string(),
                        message: "The provided data is invalid".to_string(),
                        details: Some(json!(e)),
                        code,
                    },
                )
            }

            AppError::ExecutorFailure { request_id, message } => {
                tracing::error!("💥 Falló el ejecutor de la solicitud {}: {}", request_id, message);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse {
                        error: "Executor Failure".to_string(),
                        message: "The approval could not be applied; the request is still pending admin approval and can be retried".to_string(),
                        details: Some(json!({ "request_id": request_id, "cause": message })),
                        code,
                    },
                )
            }

            AppError::MissingActor(msg) => {
                tracing::warn!("🪪 Identidad de actor ausente: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse {
                        error: "Missing Actor".to_string(),
                        message: msg,
                        details: None,
                        code,
                    },
                )
            }

            AppError::NotFound(msg) => {
                tracing::debug!("🔍 Recurso no encontrado: {}", msg);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse {
                        error: "Not Found".to_string(),
                        message: msg,
                        details: None,
                        code,
                    },
                )
            }

            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: "Bad Request".to_string(),
                        message: msg,
                        details: None,
                        code,
                    },
                )
            }

            AppError::Database(e) => {
                tracing::error!("❌ Error de base de datos: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Database Error".to_string(),
                        message: "An error occurred while accessing the database".to_string(),
                        details: Some(json!({ "sql_error": e.to_string() })),
                        code,
                    },
                )
            }

            AppError::Internal(msg) => {
                tracing::error!("❌ Error interno: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: "An unexpected error occurred".to_string(),
                        details: Some(json!({ "internal_error": msg })),
                        code,
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &'static str, message: &str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.message = Some(Cow::Owned(message.to_string()));
    error.add_param("field".into(), &field);

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &Uuid) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de transición inválida
pub fn invalid_transition(entity: &str, current: &str, attempted: &str) -> AppError {
    AppError::InvalidTransition(format!(
        "{} is '{}', cannot {}",
        entity, current, attempted
    ))
}

/// Función helper para crear errores de conflicto de versión
pub fn version_conflict(entity: &str, id: &Uuid) -> AppError {
    AppError::Conflict(format!("{} '{}' was modified concurrently", entity, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_field() {
        let err = validation_error("sale_price", "must be greater than zero");
        match err {
            AppError::Validation(errors) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("sale_price"));
                let message = fields["sale_price"][0].message.as_deref();
                assert_eq!(message, Some("must be greater than zero"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_stale_errors_share_refresh_message() {
        let response = AppError::InvalidTransition("repair is completed".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::Conflict("lost race".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_unauthorized_maps_to_forbidden() {
        let response = AppError::Unauthorized("sales only".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
