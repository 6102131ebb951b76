//! Servicio de inspecciones (RAMA → GIDIONI)
//!
//! La inspección toma la moto (`in_transit`) al crearse. Al cerrar GIDIONI,
//! los ítems fallados generan una reparación que hereda la titularidad de la
//! moto; sin fallas la moto vuelve al stock.

use tracing::info;
use uuid::Uuid;

use super::authorization_service::AuthorizationService;
use super::motorcycle_register;
use super::workflow_context::{ensure_expected, WorkflowContext};
use crate::models::{
    Actor, EntityKind, Holder, Inspection, InspectionChecklists, InspectionStatus,
    MotorcycleStatus, Repair, SellerInformation,
};
use crate::repositories::Changeset;
use crate::utils::errors::{invalid_transition, AppResult};

/// Resultado de cerrar la fase GIDIONI
#[derive(Debug, Clone)]
pub struct GidioniOutcome {
    pub inspection: Inspection,
    pub spawned_repair: Option<Repair>,
}

/// Acepta el estado guardado o el efectivo que ve el rol del actor
fn ensure_expected_phase(
    inspection: &Inspection,
    actor: &Actor,
    expected: Option<InspectionStatus>,
) -> AppResult<()> {
    match expected {
        Some(expected) if expected == inspection.effective_status(actor.role) => Ok(()),
        _ => ensure_expected("inspection", inspection.workflow_status, expected),
    }
}

#[derive(Clone)]
pub struct InspectionService {
    ctx: WorkflowContext,
}

impl InspectionService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Inspection> {
        self.ctx.store.require_inspection(id).await
    }

    pub async fn list_for_motorcycle(&self, motorcycle_id: Uuid) -> AppResult<Vec<Inspection>> {
        self.ctx.store.inspections_for_motorcycle(motorcycle_id).await
    }

    pub async fn create(
        &self,
        actor: &Actor,
        motorcycle_id: Uuid,
        contract_id: Option<Uuid>,
        customer_id: Option<Uuid>,
    ) -> AppResult<Inspection> {
        AuthorizationService::require(
            AuthorizationService::can_run_rama(actor),
            actor,
            "open inspections",
        )?;

        let mut moto = self.ctx.store.require_motorcycle(motorcycle_id).await?;
        if let Some(contract_id) = contract_id {
            self.ctx.store.require_contract(contract_id).await?;
        }

        let mut inspection = Inspection::create(motorcycle_id, contract_id, customer_id, actor.id);
        let mut changes = Changeset::new();
        motorcycle_register::hold(
            &mut changes,
            &mut moto,
            Holder::inspection(inspection.id),
            MotorcycleStatus::InTransit,
            actor,
        )?;
        changes.put(&mut inspection);
        changes.record_status(
            EntityKind::Inspection,
            inspection.id,
            None,
            inspection.workflow_status.as_str(),
            actor,
        );
        changes.put(&mut moto);
        self.ctx.commit(changes).await?;

        info!("🔎 Inspección {} abierta para la moto {}", inspection.id, motorcycle_id);
        Ok(inspection)
    }

    /// Borrador de datos del vendedor
    pub async fn save_seller_info(
        &self,
        actor: &Actor,
        id: Uuid,
        seller: SellerInformation,
        expected: Option<InspectionStatus>,
    ) -> AppResult<Inspection> {
        let mut inspection = self.ctx.store.require_inspection(id).await?;
        ensure_expected_phase(&inspection, actor, expected)?;
        inspection.save_seller_info(seller)?;
        AuthorizationService::require(
            AuthorizationService::can_run_rama(actor),
            actor,
            "edit seller information",
        )?;

        let mut changes = Changeset::new();
        changes.put(&mut inspection);
        self.ctx.commit(changes).await?;
        Ok(inspection)
    }

    pub async fn verify_rama(
        &self,
        actor: &Actor,
        id: Uuid,
        seller: Option<SellerInformation>,
        expected: Option<InspectionStatus>,
    ) -> AppResult<Inspection> {
        let mut inspection = self.ctx.store.require_inspection(id).await?;
        ensure_expected_phase(&inspection, actor, expected)?;
        if inspection.workflow_status != InspectionStatus::RamaPending {
            return Err(invalid_transition(
                "inspection",
                inspection.workflow_status.as_str(),
                "verify RAMA",
            ));
        }
        AuthorizationService::require(
            AuthorizationService::can_run_rama(actor),
            actor,
            "verify RAMA",
        )?;
        let previous = inspection.verify_rama(seller, actor.id)?;

        let mut changes = Changeset::new();
        changes.put(&mut inspection);
        changes.record_status(
            EntityKind::Inspection,
            inspection.id,
            Some(previous.as_str()),
            inspection.workflow_status.as_str(),
            actor,
        );
        self.ctx.commit(changes).await?;

        info!("📋 RAMA verificada para la inspección {}", id);
        Ok(inspection)
    }

    /// Borrador de checklists; marca la fase GIDIONI como iniciada
    pub async fn save_checklists(
        &self,
        actor: &Actor,
        id: Uuid,
        checklists: InspectionChecklists,
        expected: Option<InspectionStatus>,
    ) -> AppResult<Inspection> {
        let mut inspection = self.ctx.store.require_inspection(id).await?;
        ensure_expected_phase(&inspection, actor, expected)?;
        let previous = inspection.save_checklists(checklists)?;
        AuthorizationService::require(
            AuthorizationService::can_run_gidioni(actor),
            actor,
            "edit inspection checklists",
        )?;

        let mut changes = Changeset::new();
        changes.put(&mut inspection);
        if previous != inspection.workflow_status {
            changes.record_status(
                EntityKind::Inspection,
                inspection.id,
                Some(previous.as_str()),
                inspection.workflow_status.as_str(),
                actor,
            );
        }
        self.ctx.commit(changes).await?;
        Ok(inspection)
    }

    pub async fn verify_gidioni(
        &self,
        actor: &Actor,
        id: Uuid,
        checklists: Option<InspectionChecklists>,
        spawn_repair: bool,
        mechanic_id: Option<Uuid>,
        expected: Option<InspectionStatus>,
    ) -> AppResult<GidioniOutcome> {
        let mut inspection = self.ctx.store.require_inspection(id).await?;
        ensure_expected_phase(&inspection, actor, expected)?;
        let previous = inspection.verify_gidioni(checklists, actor.id)?;
        AuthorizationService::require(
            AuthorizationService::can_run_gidioni(actor),
            actor,
            "verify GIDIONI",
        )?;

        let mut moto = self.ctx.store.require_motorcycle(inspection.motorcycle_id).await?;
        let issues = inspection.checklists.failed_items();
        let holder = Holder::inspection(inspection.id);
        let mut changes = Changeset::new();

        let spawned_repair = if spawn_repair && !issues.is_empty() {
            let mut repair = Repair::open(
                inspection.motorcycle_id,
                mechanic_id,
                Some(inspection.id),
                format!("Issues found during GIDIONI inspection {}", inspection.id),
                issues,
            );
            motorcycle_register::transfer(
                &mut changes,
                &mut moto,
                holder,
                Holder::repair(repair.id),
                MotorcycleStatus::InRepair,
                actor,
            )?;
            changes.put(&mut repair);
            changes.record_status(EntityKind::Repair, repair.id, None, repair.status.as_str(), actor);
            inspection.spawned_repair_id = Some(repair.id);
            Some(repair)
        } else {
            motorcycle_register::release(
                &mut changes,
                &mut moto,
                holder,
                MotorcycleStatus::InStock,
                actor,
            );
            None
        };

        changes.put(&mut inspection);
        changes.record_status(
            EntityKind::Inspection,
            inspection.id,
            Some(previous.as_str()),
            inspection.workflow_status.as_str(),
            actor,
        );
        changes.put(&mut moto);
        self.ctx.commit(changes).await?;

        match &spawned_repair {
            Some(repair) => info!(
                "🚚 GIDIONI cerrada para {} con {} fallas → reparación {}",
                id,
                repair.issues_found.len(),
                repair.id
            ),
            None => info!("🚚 GIDIONI cerrada para {} sin reparación", id),
        }

        Ok(GidioniOutcome {
            inspection,
            spawned_repair,
        })
    }
}
