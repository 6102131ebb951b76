//! Modelo de Contract
//!
//! Registro mínimo de contratos de compra/venta. La generación e impresión
//! del documento es externa; aquí solo existe lo que los ejecutores de
//! aprobación necesitan para mover el estado de la moto.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "contract_type", rename_all = "snake_case")]
pub enum ContractType {
    Purchase,
    Sale,
}

text_enum!(ContractType {
    Purchase => "purchase",
    Sale => "sale",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "contract_status", rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Cancelled,
}

text_enum!(ContractStatus {
    Active => "active",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub contract_type: ContractType,
    pub motorcycle_id: Uuid,
    /// Proveedor (compra) o cliente (venta)
    pub party_id: Uuid,
    pub amount: Decimal,
    pub status: ContractStatus,
    pub approval_request_id: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(
        contract_type: ContractType,
        motorcycle_id: Uuid,
        party_id: Uuid,
        amount: Decimal,
        approval_request_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            contract_type,
            motorcycle_id,
            party_id,
            amount,
            status: ContractStatus::Active,
            approval_request_id,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
