//! Servicio de facturación / caja
//!
//! `draft → sent_to_cashier → payment_approved → paid`. La aprobación del
//! pago es la que vuelca el costo en la moto y la deja pendiente de precio.

use tracing::info;
use uuid::Uuid;

use super::authorization_service::AuthorizationService;
use super::workflow_context::{ensure_expected, WorkflowContext};
use crate::models::{
    Actor, BillStatus, EntityKind, PricingStatus, RepairBill, RepairStatus, WorkflowEvent,
};
use crate::repositories::Changeset;
use crate::utils::errors::{invalid_transition, AppError, AppResult};

#[derive(Clone)]
pub struct BillingService {
    ctx: WorkflowContext,
}

impl BillingService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<RepairBill> {
        self.ctx.store.require_bill(id).await
    }

    pub async fn list_for_repair(&self, repair_id: Uuid) -> AppResult<Vec<RepairBill>> {
        self.ctx.store.bills_for_repair(repair_id).await
    }

    /// Factura en borrador con una foto de los costos de la reparación
    pub async fn create_bill(&self, actor: &Actor, repair_id: Uuid) -> AppResult<RepairBill> {
        let repair = self.ctx.store.require_repair(repair_id).await?;
        if !matches!(repair.status, RepairStatus::DetailsApproved | RepairStatus::Completed) {
            return Err(invalid_transition("repair", repair.status.as_str(), "be billed"));
        }
        AuthorizationService::require(
            AuthorizationService::can_work_on_repair(actor, &repair),
            actor,
            "bill a repair assigned to someone else",
        )?;

        let bills = self.ctx.store.bills_for_repair(repair_id).await?;
        if let Some(active) = bills.iter().find(|b| b.status != BillStatus::Draft) {
            return Err(AppError::Conflict(format!(
                "repair '{}' already has bill '{}' at '{}'",
                repair_id, active.id, active.status
            )));
        }

        let mut bill = RepairBill::from_repair(&repair, actor.id);
        let mut changes = Changeset::new();
        changes.put(&mut bill);
        changes.record_status(EntityKind::RepairBill, bill.id, None, bill.status.as_str(), actor);
        self.ctx.commit(changes).await?;

        info!("🧾 Factura {} creada para la reparación {} ({})", bill.id, repair_id, bill.total_amount);
        Ok(bill)
    }

    pub async fn send(
        &self,
        actor: &Actor,
        id: Uuid,
        expected: Option<BillStatus>,
    ) -> AppResult<RepairBill> {
        let mut bill = self.ctx.store.require_bill(id).await?;
        ensure_expected("bill", bill.status, expected)?;
        let previous = bill.send_to_cashier()?;

        let repair = self.ctx.store.require_repair(bill.repair_id).await?;
        AuthorizationService::require(
            AuthorizationService::can_work_on_repair(actor, &repair),
            actor,
            "send a bill for a repair assigned to someone else",
        )?;

        let bills = self.ctx.store.bills_for_repair(bill.repair_id).await?;
        if let Some(active) = bills
            .iter()
            .find(|b| b.id != bill.id && b.status != BillStatus::Draft)
        {
            return Err(AppError::Conflict(format!(
                "repair '{}' already has bill '{}' at '{}'",
                bill.repair_id, active.id, active.status
            )));
        }

        let mut changes = Changeset::new();
        changes.put(&mut bill);
        changes.record_status(
            EntityKind::RepairBill,
            bill.id,
            Some(previous.as_str()),
            bill.status.as_str(),
            actor,
        );
        self.ctx.commit(changes).await?;

        info!("📤 Factura {} enviada a caja", id);
        Ok(bill)
    }

    pub async fn approve_payment(
        &self,
        actor: &Actor,
        id: Uuid,
        expected: Option<BillStatus>,
    ) -> AppResult<RepairBill> {
        let mut bill = self.ctx.store.require_bill(id).await?;
        ensure_expected("bill", bill.status, expected)?;
        let previous = bill.approve_payment(actor.id)?;
        AuthorizationService::require(
            AuthorizationService::can_handle_payments(actor),
            actor,
            "approve payments",
        )?;

        let bills = self.ctx.store.bills_for_repair(bill.repair_id).await?;
        if let Some(settled) = bills
            .iter()
            .find(|b| b.id != bill.id && b.status.is_settled())
        {
            return Err(AppError::Conflict(format!(
                "repair '{}' already has settled bill '{}'",
                bill.repair_id, settled.id
            )));
        }

        let mut moto = self.ctx.store.require_motorcycle(bill.motorcycle_id).await?;
        moto.total_cost += bill.total_amount;
        moto.pricing_status = Some(PricingStatus::PendingPricing);

        let mut changes = Changeset::new();
        changes.put(&mut bill);
        changes.record_status(
            EntityKind::RepairBill,
            bill.id,
            Some(previous.as_str()),
            bill.status.as_str(),
            actor,
        );
        changes.put(&mut moto);
        changes.emit(WorkflowEvent::new(
            EntityKind::RepairBill,
            bill.id,
            bill.status.as_str(),
            actor,
            format!("payment of {} approved", bill.total_amount),
        ));
        self.ctx.commit(changes).await?;

        info!(
            "💵 Pago aprobado para la factura {}; costo total de la moto {} = {}",
            id, moto.id, moto.total_cost
        );
        Ok(bill)
    }

    pub async fn mark_paid(
        &self,
        actor: &Actor,
        id: Uuid,
        expected: Option<BillStatus>,
    ) -> AppResult<RepairBill> {
        let mut bill = self.ctx.store.require_bill(id).await?;
        ensure_expected("bill", bill.status, expected)?;
        let previous = bill.mark_paid()?;
        AuthorizationService::require(
            AuthorizationService::can_handle_payments(actor),
            actor,
            "mark bills as paid",
        )?;

        let mut changes = Changeset::new();
        changes.put(&mut bill);
        changes.record_status(
            EntityKind::RepairBill,
            bill.id,
            Some(previous.as_str()),
            bill.status.as_str(),
            actor,
        );
        self.ctx.commit(changes).await?;

        info!("✅ Factura {} pagada", id);
        Ok(bill)
    }
}
