//! Extracción del actor
//!
//! La autenticación es externa: el proxy de identidad entrega el id y el rol
//! del usuario en `X-Actor-Id` / `X-Actor-Role`. Este extractor solo los
//! parsea; la autorización queda en los servicios.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::models::{Actor, Role};
use crate::utils::errors::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::MissingActor(format!("header '{}' is required", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = Uuid::parse_str(header(parts, ACTOR_ID_HEADER)?)
            .map_err(|_| AppError::MissingActor(format!("header '{}' must be a UUID", ACTOR_ID_HEADER)))?;
        let role: Role = header(parts, ACTOR_ROLE_HEADER)?
            .parse()
            .map_err(AppError::MissingActor)?;

        Ok(Actor::new(id, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Actor, AppError> {
        let (mut parts, _) = request.into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_actor_from_headers() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(ACTOR_ID_HEADER, id.to_string())
            .header(ACTOR_ROLE_HEADER, "Cashier")
            .body(())
            .unwrap();

        assert_eq!(extract(request).await.unwrap(), Actor::new(id, Role::Cashier));
    }

    #[tokio::test]
    async fn test_missing_or_invalid_headers() {
        let missing = Request::builder().body(()).unwrap();
        assert!(matches!(extract(missing).await, Err(AppError::MissingActor(_))));

        let bad_role = Request::builder()
            .header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .header(ACTOR_ROLE_HEADER, "superuser")
            .body(())
            .unwrap();
        assert!(matches!(extract(bad_role).await, Err(AppError::MissingActor(_))));
    }
}
