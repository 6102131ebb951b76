//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Los valores inválidos son errores de arranque, nunca un panic.

use std::env;
use std::str::FromStr;

use thiserror::Error;

/// Umbral máximo de antigüedad de solicitudes (diez años)
pub const MAX_STALE_AFTER_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    /// Sin URL se usa el store en memoria
    pub database_url: Option<String>,
    /// Vacío = CORS permisivo
    pub cors_origins: Vec<String>,
    pub approval_stale_after_hours: i64,
    pub notify_webhook_url: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            database_url: None,
            cors_origins: Vec::new(),
            approval_stale_after_hours: 72,
            notify_webhook_url: None,
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

fn parse_bounded(name: &'static str, default: i64, min: i64, max: i64) -> Result<i64, ConfigError> {
    let value = parse_number(name, default)?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange { name, value, min, max });
    }
    Ok(value)
}

impl EnvironmentConfig {
    /// Lee la configuración del entorno (ya cargado `.env` por `dotenvy`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            environment: non_empty("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_number("PORT", defaults.port)?,
            host: non_empty("HOST").unwrap_or(defaults.host),
            database_url: non_empty("DATABASE_URL"),
            cors_origins: non_empty("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            approval_stale_after_hours: parse_bounded(
                "APPROVAL_STALE_AFTER_HOURS",
                defaults.approval_stale_after_hours,
                1,
                MAX_STALE_AFTER_HOURS,
            )?,
            notify_webhook_url: non_empty("NOTIFY_WEBHOOK_URL"),
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Fuera de rango vuelve al tope de `MAX_STALE_AFTER_HOURS`
    pub fn approval_stale_after(&self) -> chrono::Duration {
        let hours = self.approval_stale_after_hours.clamp(1, MAX_STALE_AFTER_HOURS);
        chrono::Duration::hours(hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnvironmentConfig::default();
        assert!(config.is_development());
        assert_eq!(config.server_url(), "0.0.0.0:3000");
        assert_eq!(config.approval_stale_after(), chrono::Duration::hours(72));
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        env::set_var("MOTO_TEST_PORT", "treinta");
        let result: Result<u16, _> = parse_number("MOTO_TEST_PORT", 3000);
        assert!(matches!(result, Err(ConfigError::InvalidNumber { .. })));
        env::remove_var("MOTO_TEST_PORT");

        let fallback: u16 = parse_number("MOTO_TEST_UNSET_PORT", 3000).unwrap();
        assert_eq!(fallback, 3000);
    }

    #[test]
    fn test_huge_stale_threshold_is_rejected() {
        env::set_var("MOTO_TEST_STALE_HOURS", i64::MAX.to_string());
        let result = parse_bounded("MOTO_TEST_STALE_HOURS", 72, 1, MAX_STALE_AFTER_HOURS);
        assert!(matches!(result, Err(ConfigError::OutOfRange { .. })));
        env::remove_var("MOTO_TEST_STALE_HOURS");

        let config = EnvironmentConfig {
            approval_stale_after_hours: i64::MAX,
            ..EnvironmentConfig::default()
        };
        assert_eq!(
            config.approval_stale_after(),
            chrono::Duration::hours(MAX_STALE_AFTER_HOURS)
        );
    }
}
