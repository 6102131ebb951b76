//! Modelo de Motorcycle
//!
//! Registro canónico del estado de stock y de los campos de precio de una
//! moto. Solo los workflows (reparación, inspección, facturación, precio)
//! mutan `status`; la titularidad de un workflow activo queda en `hold`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

/// Estado de stock de la moto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "motorcycle_status", rename_all = "snake_case")]
pub enum MotorcycleStatus {
    InStock,
    Sold,
    InRepair,
    InTransit,
    Reserved,
}

text_enum!(MotorcycleStatus {
    InStock => "in_stock",
    Sold => "sold",
    InRepair => "in_repair",
    InTransit => "in_transit",
    Reserved => "reserved",
});

/// Estado del proceso de fijación de precio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "pricing_status", rename_all = "snake_case")]
pub enum PricingStatus {
    PendingPricing,
    Approved,
}

text_enum!(PricingStatus {
    PendingPricing => "pending_pricing",
    Approved => "approved",
});

/// Tipo de workflow que puede reclamar una moto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "hold_kind", rename_all = "snake_case")]
pub enum HoldKind {
    Repair,
    Inspection,
}

text_enum!(HoldKind {
    Repair => "repair",
    Inspection => "inspection",
});

/// Workflow que tiene la titularidad de la moto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub kind: HoldKind,
    pub id: Uuid,
}

impl Holder {
    pub fn repair(id: Uuid) -> Self {
        Self { kind: HoldKind::Repair, id }
    }

    pub fn inspection(id: Uuid) -> Self {
        Self { kind: HoldKind::Inspection, id }
    }
}

impl std::fmt::Display for Holder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Motorcycle principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motorcycle {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub registration_number: Option<String>,
    pub chassis_number: Option<String>,
    pub status: MotorcycleStatus,
    pub pricing_status: Option<PricingStatus>,
    pub acquisition_cost: Decimal,
    pub total_cost: Decimal,
    pub sale_price: Option<Decimal>,
    pub profit_margin: Option<Decimal>,
    pub price_in: Option<Decimal>,
    pub price_out: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub hold: Option<Holder>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Datos descriptivos para registrar una moto
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorcycleDetails {
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub registration_number: Option<String>,
    pub chassis_number: Option<String>,
}

impl Motorcycle {
    /// Moto recién adquirida, disponible en stock con su costo de compra
    pub fn register(details: MotorcycleDetails, acquisition_cost: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            brand: details.brand,
            model: details.model,
            year: details.year,
            registration_number: details.registration_number,
            chassis_number: details.chassis_number,
            status: MotorcycleStatus::InStock,
            pricing_status: None,
            acquisition_cost,
            total_cost: acquisition_cost,
            sale_price: None,
            profit_margin: None,
            price_in: None,
            price_out: None,
            profit: None,
            hold: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_held(&self) -> bool {
        self.hold.is_some()
    }

    pub fn is_held_by(&self, holder: Holder) -> bool {
        self.hold == Some(holder)
    }
}
