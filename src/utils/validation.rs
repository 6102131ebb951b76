//! Utilidades de validación
//!
//! Funciones helper usadas desde `#[validate(custom = "...")]` en los DTOs.

use rust_decimal::Decimal;
use serde::Serialize;
use validator::ValidationError;

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un valor sea positivo
pub fn validate_positive<T: PartialOrd + std::fmt::Display + num_traits::Zero + Serialize>(
    value: T,
) -> Result<(), ValidationError> {
    if value <= T::zero() {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

/// Validar que un valor sea no negativo
pub fn validate_non_negative<T: PartialOrd + std::fmt::Display + num_traits::Zero + Serialize>(
    value: T,
) -> Result<(), ValidationError> {
    if value < T::zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

pub fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    validate_positive(*value)
}

pub fn non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(*value)
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    validate_not_empty(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(5).is_ok());
        assert!(validate_positive(0).is_err());
        assert!(validate_positive(-5).is_err());
        assert!(positive_amount(&Decimal::new(1500, 2)).is_ok());
        assert!(positive_amount(&Decimal::ZERO).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(non_negative_amount(&Decimal::ZERO).is_ok());
        assert!(non_negative_amount(&Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("Honda").is_ok());
        assert!(not_blank("   ").is_err());
    }
}
