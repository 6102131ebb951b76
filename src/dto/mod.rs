//! DTOs de la API
//!
//! Payloads de entrada validados con `validator` y el sobre `ApiResponse`
//! de todas las respuestas exitosas.

pub mod api_response;
pub mod approval_dto;
pub mod billing_dto;
pub mod inspection_dto;
pub mod motorcycle_dto;
pub mod repair_dto;

pub use api_response::ApiResponse;

use serde::Deserialize;

/// Cuerpo de una transición sin más datos que el estado previo esperado
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest<S> {
    pub expected_status: Option<S>,
}

impl<S> Default for TransitionRequest<S> {
    fn default() -> Self {
        Self {
            expected_status: None,
        }
    }
}
