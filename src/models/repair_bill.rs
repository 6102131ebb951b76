//! Modelo de RepairBill
//!
//! Factura generada desde una reparación aprobada. Los montos son una foto
//! congelada de la reparación al momento de crearla.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use super::repair::Repair;
use crate::utils::errors::{invalid_transition, AppResult};

/// Estado de la factura
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "bill_status", rename_all = "snake_case")]
pub enum BillStatus {
    Draft,
    SentToCashier,
    PaymentApproved,
    Paid,
}

text_enum!(BillStatus {
    Draft => "draft",
    SentToCashier => "sent_to_cashier",
    PaymentApproved => "payment_approved",
    Paid => "paid",
});

impl BillStatus {
    pub fn next_states(&self) -> &'static [BillStatus] {
        use BillStatus::*;
        match self {
            Draft => &[SentToCashier],
            SentToCashier => &[PaymentApproved],
            PaymentApproved => &[Paid],
            Paid => &[],
        }
    }

    /// Factura que ya consumió el ciclo de pago de su reparación
    pub fn is_settled(&self) -> bool {
        matches!(self, BillStatus::PaymentApproved | BillStatus::Paid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairBill {
    pub id: Uuid,
    pub repair_id: Uuid,
    pub motorcycle_id: Uuid,
    pub status: BillStatus,
    pub labor_cost: Decimal,
    pub spare_parts_cost: Decimal,
    pub total_amount: Decimal,
    pub created_by: Uuid,
    pub payment_approved_by: Option<Uuid>,
    pub payment_approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepairBill {
    pub fn from_repair(repair: &Repair, created_by: Uuid) -> Self {
        let now = Utc::now();
        let labor_cost = repair.labor_cost;
        let spare_parts_cost = repair.spare_parts_cost();
        Self {
            id: Uuid::new_v4(),
            repair_id: repair.id,
            motorcycle_id: repair.motorcycle_id,
            status: BillStatus::Draft,
            labor_cost,
            spare_parts_cost,
            total_amount: labor_cost + spare_parts_cost,
            created_by,
            payment_approved_by: None,
            payment_approved_at: None,
            paid_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn advance(&mut self, next: BillStatus, attempted: &str) -> AppResult<BillStatus> {
        if !self.status.next_states().contains(&next) {
            return Err(invalid_transition("bill", self.status.as_str(), attempted));
        }
        let previous = self.status;
        self.status = next;
        Ok(previous)
    }

    pub fn send_to_cashier(&mut self) -> AppResult<BillStatus> {
        self.advance(BillStatus::SentToCashier, "send to cashier")
    }

    pub fn approve_payment(&mut self, cashier_id: Uuid) -> AppResult<BillStatus> {
        let previous = self.advance(BillStatus::PaymentApproved, "approve payment")?;
        self.payment_approved_by = Some(cashier_id);
        self.payment_approved_at = Some(Utc::now());
        Ok(previous)
    }

    pub fn mark_paid(&mut self) -> AppResult<BillStatus> {
        let previous = self.advance(BillStatus::Paid, "mark as paid")?;
        self.paid_at = Some(Utc::now());
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::repair::SparePart;

    #[test]
    fn test_bill_snapshots_repair_costs() {
        let mut repair = Repair::open(Uuid::new_v4(), None, None, "x".into(), vec![]);
        repair.labor_cost = Decimal::from(50_000);
        repair.spare_parts = vec![SparePart {
            name: "cadena".into(),
            quantity: 1,
            cost: Decimal::from(100_000),
        }];

        let bill = RepairBill::from_repair(&repair, Uuid::new_v4());
        assert_eq!(bill.total_amount, Decimal::from(150_000));
        assert_eq!(bill.total_amount, bill.labor_cost + bill.spare_parts_cost);
        assert_eq!(bill.status, BillStatus::Draft);
    }

    #[test]
    fn test_bill_cannot_skip_cashier() {
        let repair = Repair::open(Uuid::new_v4(), None, None, "x".into(), vec![]);
        let mut bill = RepairBill::from_repair(&repair, Uuid::new_v4());
        assert!(bill.approve_payment(Uuid::new_v4()).is_err());
        bill.send_to_cashier().unwrap();
        assert!(bill.mark_paid().is_err());
        bill.approve_payment(Uuid::new_v4()).unwrap();
        bill.mark_paid().unwrap();
        assert_eq!(bill.status, BillStatus::Paid);
    }
}
