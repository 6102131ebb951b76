//! Middleware del sistema
//!
//! Este módulo contiene la extracción de la identidad del actor, el cuerpo
//! JSON opcional de las transiciones y la configuración de CORS.

pub mod actor;
pub mod cors;
pub mod optional_json;

pub use actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use cors::cors_layer;
pub use optional_json::OptionalJson;
