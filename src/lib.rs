//! Motor de workflow para compra, reparación, inspección y venta de motos
//!
//! Este crate expone los modelos, servicios y rutas del motor para que el
//! binario y los tests de integración compartan el mismo código.

pub mod config;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
