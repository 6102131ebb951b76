//! Fijación del precio de venta
//!
//! `sale_price = total_cost × (1 + margin / 100)`, redondeado a la unidad
//! monetaria (mitad hacia arriba, lejos de cero). La inversa redondea el
//! margen a dos decimales.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;
use uuid::Uuid;

use super::authorization_service::AuthorizationService;
use super::workflow_context::{ensure_expected, WorkflowContext};
use crate::models::{Actor, EntityKind, Motorcycle, MotorcycleStatus, PricingStatus};
use crate::repositories::Changeset;
use crate::utils::errors::{invalid_transition, validation_error, AppError, AppResult};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub fn sale_price_from_margin(total_cost: Decimal, margin: Decimal) -> Decimal {
    (total_cost * (Decimal::ONE + margin / HUNDRED))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

pub fn margin_from_sale_price(total_cost: Decimal, sale_price: Decimal) -> Decimal {
    ((sale_price - total_cost) / total_cost * HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Precio elegido: uno de los dos valores, el otro se deriva
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceInput {
    Margin(Decimal),
    SalePrice(Decimal),
}

impl PriceInput {
    pub fn from_parts(profit_margin: Option<Decimal>, sale_price: Option<Decimal>) -> AppResult<Self> {
        match (profit_margin, sale_price) {
            (Some(margin), None) => Ok(PriceInput::Margin(margin)),
            (None, Some(price)) => Ok(PriceInput::SalePrice(price)),
            _ => Err(validation_error(
                "profit_margin",
                "provide exactly one of profit_margin or sale_price",
            )),
        }
    }
}

/// Escribe precio, margen y los valores congelados en la moto
pub fn apply_price(moto: &mut Motorcycle, input: PriceInput) -> AppResult<()> {
    if moto.total_cost <= Decimal::ZERO {
        return Err(validation_error(
            "total_cost",
            "total cost must be positive before pricing",
        ));
    }

    let (sale_price, margin) = match input {
        PriceInput::Margin(margin) => (sale_price_from_margin(moto.total_cost, margin), margin),
        PriceInput::SalePrice(price) => (price, margin_from_sale_price(moto.total_cost, price)),
    };
    if sale_price <= Decimal::ZERO {
        return Err(validation_error("sale_price", "sale price must be positive"));
    }

    moto.sale_price = Some(sale_price);
    moto.profit_margin = Some(margin);
    moto.price_in = Some(moto.total_cost);
    moto.price_out = Some(sale_price);
    moto.profit = Some(sale_price - moto.total_cost);
    moto.pricing_status = Some(PricingStatus::Approved);
    Ok(())
}

#[derive(Clone)]
pub struct PricingService {
    ctx: WorkflowContext,
}

impl PricingService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn set_sale_price(
        &self,
        actor: &Actor,
        motorcycle_id: Uuid,
        input: PriceInput,
        expected: Option<PricingStatus>,
    ) -> AppResult<Motorcycle> {
        let mut moto = self.ctx.store.require_motorcycle(motorcycle_id).await?;
        if let Some(expected) = expected {
            match moto.pricing_status {
                Some(current) => ensure_expected("motorcycle pricing", current, Some(expected))?,
                None => {
                    return Err(AppError::Conflict(format!(
                        "motorcycle pricing is unset, caller expected '{}'",
                        expected
                    )))
                }
            }
        }

        if moto.pricing_status != Some(PricingStatus::PendingPricing) {
            let current = moto.pricing_status.map_or("unset", |p| p.as_str());
            return Err(invalid_transition("motorcycle pricing", current, "set the sale price"));
        }
        AuthorizationService::require(
            AuthorizationService::can_set_sale_price(actor),
            actor,
            "set sale prices",
        )?;
        if let Some(holder) = moto.hold {
            return Err(invalid_transition(
                "motorcycle",
                &format!("held by {}", holder),
                "set the sale price",
            ));
        }

        apply_price(&mut moto, input)?;

        let mut changes = Changeset::new();
        if moto.status != MotorcycleStatus::InStock {
            changes.record_status(
                EntityKind::Motorcycle,
                moto.id,
                Some(moto.status.as_str()),
                MotorcycleStatus::InStock.as_str(),
                actor,
            );
            moto.status = MotorcycleStatus::InStock;
        }
        changes.put(&mut moto);
        self.ctx.commit(changes).await?;

        info!(
            "💰 Precio fijado para moto '{}': costo {} → venta {:?} (margen {:?}%)",
            moto.id, moto.total_cost, moto.sale_price, moto.profit_margin
        );
        Ok(moto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MotorcycleDetails;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_sale_price_from_margin() {
        assert_eq!(sale_price_from_margin(dec("1000000"), dec("20")), dec("1200000"));
        // 333.333... * 1.15 = 383.33 → 383
        assert_eq!(sale_price_from_margin(dec("333.33"), dec("15")), dec("383"));
        // 10.5 redondea lejos de cero
        assert_eq!(sale_price_from_margin(dec("7"), dec("50")), dec("11"));
    }

    #[test]
    fn test_margin_round_trip_within_one_unit() {
        let total = dec("1234567");
        for margin in ["0", "7.5", "12.34", "20", "33.33", "150"] {
            let margin = dec(margin);
            let price = sale_price_from_margin(total, margin);
            let back = margin_from_sale_price(total, price);
            let repriced = sale_price_from_margin(total, back);
            assert!((repriced - price).abs() <= Decimal::ONE, "margin {}", margin);
        }
    }

    #[test]
    fn test_price_input_requires_exactly_one() {
        assert!(PriceInput::from_parts(None, None).is_err());
        assert!(PriceInput::from_parts(Some(Decimal::TEN), Some(Decimal::TEN)).is_err());
        assert_eq!(
            PriceInput::from_parts(None, Some(Decimal::TEN)).unwrap(),
            PriceInput::SalePrice(Decimal::TEN)
        );
    }

    #[test]
    fn test_apply_price_freezes_values() {
        let mut moto = Motorcycle::register(MotorcycleDetails::default(), dec("1000000"));
        apply_price(&mut moto, PriceInput::Margin(dec("20"))).unwrap();

        assert_eq!(moto.sale_price, Some(dec("1200000")));
        assert_eq!(moto.price_in, Some(dec("1000000")));
        assert_eq!(moto.profit, Some(dec("200000")));
        assert_eq!(moto.pricing_status, Some(PricingStatus::Approved));
    }

    #[test]
    fn test_apply_price_rejects_non_positive() {
        let mut moto = Motorcycle::register(MotorcycleDetails::default(), dec("1000"));
        assert!(apply_price(&mut moto, PriceInput::Margin(dec("-100"))).is_err());
        assert!(apply_price(&mut moto, PriceInput::SalePrice(Decimal::ZERO)).is_err());

        let mut free = Motorcycle::register(MotorcycleDetails::default(), Decimal::ZERO);
        assert!(apply_price(&mut free, PriceInput::Margin(dec("10"))).is_err());
    }
}
