//! Servicio de reparaciones
//!
//! Orquesta el workflow de reparación. Los pasos que también ejecuta la
//! cadena de aprobación (`repair_creation`, `repair_completion`) viven en
//! `stage_assignment` y `stage_completion` para que ambos caminos escriban
//! exactamente los mismos efectos.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::approval_service::stage_request;
use super::authorization_service::AuthorizationService;
use super::executors::{ExecutorRegistry, RepairEditData};
use super::motorcycle_register::{self, ReleaseOutcome};
use super::workflow_context::{ensure_expected, WorkflowContext};
use crate::models::{
    Actor, ApprovalKind, ApprovalPriority, ApprovalRequest, EntityKind, Holder, MotorcycleStatus,
    Repair, RepairStatus, WorkItem, WorkSummary, WorkflowEvent,
};
use crate::repositories::{Changeset, WorkflowStore};
use crate::utils::errors::{invalid_transition, validation_error, AppError, AppResult};

/// Crea la reparación en `pending` y toma la moto (`in_repair`)
pub async fn stage_assignment(
    store: &dyn WorkflowStore,
    changes: &mut Changeset,
    actor: &Actor,
    motorcycle_id: Uuid,
    mechanic_id: Option<Uuid>,
    description: String,
) -> AppResult<Repair> {
    if description.trim().is_empty() {
        return Err(validation_error("description", "a repair needs a description"));
    }

    let mut moto = store.require_motorcycle(motorcycle_id).await?;
    let mut repair = Repair::open(motorcycle_id, mechanic_id, None, description, Vec::new());

    motorcycle_register::hold(
        changes,
        &mut moto,
        Holder::repair(repair.id),
        MotorcycleStatus::InRepair,
        actor,
    )?;

    changes.put(&mut repair);
    changes.record_status(EntityKind::Repair, repair.id, None, repair.status.as_str(), actor);
    changes.put(&mut moto);
    Ok(repair)
}

/// Efectos de una reparación ya marcada `completed`: devuelve la moto al
/// stock. El precio no se toca; sólo `approve_payment` lo deja pendiente,
/// cuando el costo de la factura ya está sumado.
pub async fn stage_completion(
    store: &dyn WorkflowStore,
    changes: &mut Changeset,
    actor: &Actor,
    repair: &mut Repair,
    previous: RepairStatus,
) -> AppResult<()> {
    let mut moto = store.require_motorcycle(repair.motorcycle_id).await?;

    let outcome = motorcycle_register::release(
        changes,
        &mut moto,
        Holder::repair(repair.id),
        MotorcycleStatus::InStock,
        actor,
    );
    if outcome == ReleaseOutcome::Released {
        changes.put(&mut moto);
    }

    changes.put(repair);
    changes.record_status(
        EntityKind::Repair,
        repair.id,
        Some(previous.as_str()),
        repair.status.as_str(),
        actor,
    );
    changes.emit(WorkflowEvent::new(
        EntityKind::Repair,
        repair.id,
        repair.status.as_str(),
        actor,
        format!("repair of motorcycle {} completed", repair.motorcycle_id),
    ));
    Ok(())
}

#[derive(Clone)]
pub struct RepairService {
    ctx: WorkflowContext,
    executors: Arc<ExecutorRegistry>,
}

impl RepairService {
    pub fn new(ctx: WorkflowContext, executors: Arc<ExecutorRegistry>) -> Self {
        Self { ctx, executors }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Repair> {
        self.ctx.store.require_repair(id).await
    }

    pub async fn list_for_motorcycle(&self, motorcycle_id: Uuid) -> AppResult<Vec<Repair>> {
        self.ctx.store.repairs_for_motorcycle(motorcycle_id).await
    }

    /// Asignación directa por un admin
    pub async fn assign(
        &self,
        actor: &Actor,
        motorcycle_id: Uuid,
        mechanic_id: Option<Uuid>,
        description: String,
    ) -> AppResult<Repair> {
        AuthorizationService::require(
            AuthorizationService::can_assign_repair(actor),
            actor,
            "assign repairs directly (submit a repair_creation request instead)",
        )?;

        let mut changes = Changeset::new();
        let repair = stage_assignment(
            self.ctx.store.as_ref(),
            &mut changes,
            actor,
            motorcycle_id,
            mechanic_id,
            description,
        )
        .await?;
        self.ctx.commit(changes).await?;

        info!("🔧 Reparación {} asignada a la moto {}", repair.id, motorcycle_id);
        Ok(repair)
    }

    pub async fn assign_mechanic(
        &self,
        actor: &Actor,
        id: Uuid,
        mechanic_id: Uuid,
        expected: Option<RepairStatus>,
    ) -> AppResult<Repair> {
        let mut repair = self.ctx.store.require_repair(id).await?;
        ensure_expected("repair", repair.status, expected)?;
        repair.assign_mechanic(mechanic_id)?;
        AuthorizationService::require(
            AuthorizationService::can_assign_repair(actor),
            actor,
            "assign mechanics",
        )?;

        let mut changes = Changeset::new();
        changes.put(&mut repair);
        self.ctx.commit(changes).await?;

        info!("👨‍🔧 Mecánico {} asignado a la reparación {}", mechanic_id, id);
        Ok(repair)
    }

    pub async fn start_work(
        &self,
        actor: &Actor,
        id: Uuid,
        expected: Option<RepairStatus>,
    ) -> AppResult<Repair> {
        let mut repair = self.ctx.store.require_repair(id).await?;
        ensure_expected("repair", repair.status, expected)?;
        let previous = repair.start_work()?;
        AuthorizationService::require(
            AuthorizationService::can_work_on_repair(actor, &repair),
            actor,
            "work on a repair assigned to someone else",
        )?;

        let mut changes = Changeset::new();
        changes.put(&mut repair);
        changes.record_status(
            EntityKind::Repair,
            repair.id,
            Some(previous.as_str()),
            repair.status.as_str(),
            actor,
        );
        self.ctx.commit(changes).await?;

        info!("🔧 Reparación {} en curso", id);
        Ok(repair)
    }

    /// Registra el trabajo hecho y envía la solicitud `repair_edit`
    pub async fn register_details(
        &self,
        actor: &Actor,
        id: Uuid,
        work_items: Vec<WorkItem>,
        issues_found: Vec<String>,
        proof_of_work: Vec<String>,
        expected: Option<RepairStatus>,
    ) -> AppResult<(Repair, ApprovalRequest)> {
        let mut repair = self.ctx.store.require_repair(id).await?;
        ensure_expected("repair", repair.status, expected)?;
        if !repair.status.can_become(RepairStatus::AwaitingDetailsApproval) {
            return Err(invalid_transition("repair", repair.status.as_str(), "register details"));
        }
        AuthorizationService::require(
            AuthorizationService::can_work_on_repair(actor, &repair),
            actor,
            "register details on a repair assigned to someone else",
        )?;

        let summary = WorkSummary::from_items(&work_items)?;
        let mut changes = Changeset::new();
        let request = stage_request(
            &self.executors,
            &mut changes,
            ApprovalKind::RepairEdit,
            edit_payload(repair.id, work_items, &summary)?,
            actor,
            ApprovalPriority::Normal,
        )?;

        let previous = repair.record_details(&summary, issues_found, proof_of_work, request.id)?;
        changes.put(&mut repair);
        changes.record_status(
            EntityKind::Repair,
            repair.id,
            Some(previous.as_str()),
            repair.status.as_str(),
            actor,
        );
        self.ctx.commit(changes).await?;

        info!(
            "🧾 Detalles registrados para la reparación {} (total {}), solicitud {}",
            id, summary.total_cost, request.id
        );
        Ok((repair, request))
    }

    /// Propone una corrección de costos sobre una reparación ya aprobada
    pub async fn request_cost_edit(
        &self,
        actor: &Actor,
        id: Uuid,
        work_items: Vec<WorkItem>,
        priority: ApprovalPriority,
    ) -> AppResult<ApprovalRequest> {
        let repair = self.ctx.store.require_repair(id).await?;
        if !matches!(repair.status, RepairStatus::DetailsApproved | RepairStatus::Completed) {
            return Err(invalid_transition("repair", repair.status.as_str(), "request a cost edit"));
        }
        AuthorizationService::require(
            AuthorizationService::can_work_on_repair(actor, &repair),
            actor,
            "edit costs of a repair assigned to someone else",
        )?;

        let summary = WorkSummary::from_items(&work_items)?;
        let mut changes = Changeset::new();
        let request = stage_request(
            &self.executors,
            &mut changes,
            ApprovalKind::RepairEdit,
            edit_payload(repair.id, work_items, &summary)?,
            actor,
            priority,
        )?;
        self.ctx.commit(changes).await?;

        info!("✏️ Edición de costos solicitada para la reparación {}", id);
        Ok(request)
    }

    pub async fn complete(
        &self,
        actor: &Actor,
        id: Uuid,
        expected: Option<RepairStatus>,
    ) -> AppResult<Repair> {
        let mut repair = self.ctx.store.require_repair(id).await?;
        ensure_expected("repair", repair.status, expected)?;
        let previous = repair.complete()?;
        AuthorizationService::require(
            AuthorizationService::can_work_on_repair(actor, &repair),
            actor,
            "complete a repair assigned to someone else",
        )?;

        let mut changes = Changeset::new();
        stage_completion(self.ctx.store.as_ref(), &mut changes, actor, &mut repair, previous).await?;
        self.ctx.commit(changes).await?;

        info!("✅ Reparación {} completada", id);
        Ok(repair)
    }

    /// Cancela la reparación y libera la moto. Si los detalles esperaban
    /// aprobación, la solicitud `repair_edit` abierta se rechaza en el mismo
    /// commit.
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: Uuid,
        expected: Option<RepairStatus>,
    ) -> AppResult<Repair> {
        let mut repair = self.ctx.store.require_repair(id).await?;
        ensure_expected("repair", repair.status, expected)?;
        let previous = repair.cancel()?;
        AuthorizationService::require(
            AuthorizationService::can_cancel_repair(actor),
            actor,
            "cancel repairs",
        )?;

        let mut moto = self.ctx.store.require_motorcycle(repair.motorcycle_id).await?;
        let mut changes = Changeset::new();
        match motorcycle_register::release(
            &mut changes,
            &mut moto,
            Holder::repair(repair.id),
            MotorcycleStatus::InStock,
            actor,
        ) {
            ReleaseOutcome::Released => changes.put(&mut moto),
            ReleaseOutcome::NotHeld => {}
            ReleaseOutcome::HeldByOther(holder) => {
                warn!("🔐 Reparación {} cancelada sin liberar la moto (titular {})", id, holder)
            }
        }

        if previous == RepairStatus::AwaitingDetailsApproval {
            if let Some(request_id) = repair.details_request_id {
                let mut request = self.ctx.store.require_approval(request_id).await?;
                if request.status.is_pending() {
                    let pending = request.reject(actor, "repair cancelled")?;
                    changes.put(&mut request);
                    changes.record_status(
                        EntityKind::ApprovalRequest,
                        request.id,
                        Some(pending.as_str()),
                        request.status.as_str(),
                        actor,
                    );
                }
            }
        }

        changes.put(&mut repair);
        changes.record_status(
            EntityKind::Repair,
            repair.id,
            Some(previous.as_str()),
            repair.status.as_str(),
            actor,
        );
        self.ctx.commit(changes).await?;

        info!("🛑 Reparación {} cancelada", id);
        Ok(repair)
    }
}

fn edit_payload(
    repair_id: Uuid,
    work_items: Vec<WorkItem>,
    summary: &WorkSummary,
) -> AppResult<serde_json::Value> {
    serde_json::to_value(RepairEditData {
        repair_id,
        work_items,
        total_cost: Some(summary.total_cost),
    })
    .map_err(|e| AppError::Internal(format!("cannot encode repair_edit payload: {}", e)))
}
