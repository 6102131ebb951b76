//! Cuerpo JSON opcional
//!
//! Las transiciones aceptan un cuerpo vacío (se usa `T::default()`), pero un
//! cuerpo presente debe ser JSON válido para `T`. Un `expected_status` mal
//! escrito es un 400, nunca una transición sin verificar.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::utils::errors::AppError;

#[derive(Debug, Clone, Default)]
pub struct OptionalJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::TransitionRequest;
    use crate::models::RepairStatus;
    use axum::body::Body;
    use axum::http;

    async fn extract(body: &'static str) -> Result<TransitionRequest<RepairStatus>, AppError> {
        let request = http::Request::builder().body(Body::from(body)).unwrap();
        OptionalJson::from_request(request, &())
            .await
            .map(|OptionalJson(inner)| inner)
    }

    #[tokio::test]
    async fn test_empty_body_uses_default() {
        assert_eq!(extract("").await.unwrap().expected_status, None);
        assert_eq!(extract("  \n").await.unwrap().expected_status, None);
    }

    #[tokio::test]
    async fn test_known_status_is_parsed() {
        let parsed = extract(r#"{"expected_status":"in_progress"}"#).await.unwrap();
        assert_eq!(parsed.expected_status, Some(RepairStatus::InProgress));
    }

    #[tokio::test]
    async fn test_misspelled_status_is_rejected() {
        let result = extract(r#"{"expected_status":"in_progres"}"#).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = extract("{not json").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
