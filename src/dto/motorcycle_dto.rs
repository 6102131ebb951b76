use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::{MotorcycleDetails, PricingStatus};
use crate::utils::validation::{non_negative_amount, not_blank, positive_amount};

// Request para registrar una moto
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterMotorcycleRequest {
    #[validate(custom = "not_blank")]
    pub brand: String,
    #[validate(custom = "not_blank")]
    pub model: String,
    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,
    pub registration_number: Option<String>,
    pub chassis_number: Option<String>,
    #[validate(custom = "non_negative_amount")]
    pub acquisition_cost: Decimal,
}

impl RegisterMotorcycleRequest {
    pub fn into_parts(self) -> (MotorcycleDetails, Decimal) {
        (
            MotorcycleDetails {
                brand: self.brand,
                model: self.model,
                year: self.year,
                registration_number: self.registration_number,
                chassis_number: self.chassis_number,
            },
            self.acquisition_cost,
        )
    }
}

// Request para fijar el precio: exactamente uno de los dos valores
#[derive(Debug, Deserialize, Validate)]
pub struct SetSalePriceRequest {
    pub profit_margin: Option<Decimal>,
    #[validate(custom = "positive_amount")]
    pub sale_price: Option<Decimal>,
    pub expected_status: Option<PricingStatus>,
}
