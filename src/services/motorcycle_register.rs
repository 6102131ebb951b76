//! Registro de estado de motos
//!
//! Único lugar donde se cambia `Motorcycle.status` por efecto de un
//! workflow. Reparación e inspección toman la titularidad con `hold`, la
//! devuelven con `release` y una inspección puede pasarla a su reparación
//! con `transfer`. Estas funciones solo mutan la moto y anotan el historial;
//! el llamador agenda la escritura con `Changeset::put` una sola vez.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::authorization_service::AuthorizationService;
use super::workflow_context::WorkflowContext;
use crate::models::{
    Actor, EntityKind, HoldKind, Holder, Inspection, Motorcycle, MotorcycleDetails,
    MotorcycleStatus, Repair, StatusHistoryEntry,
};
use crate::repositories::Changeset;
use crate::utils::errors::{AppError, AppResult};

/// Resultado de liberar una moto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    NotHeld,
    HeldByOther(Holder),
}

fn set_status(changes: &mut Changeset, moto: &mut Motorcycle, status: MotorcycleStatus, actor: &Actor) {
    if moto.status == status {
        return;
    }
    changes.record_status(
        EntityKind::Motorcycle,
        moto.id,
        Some(moto.status.as_str()),
        status.as_str(),
        actor,
    );
    moto.status = status;
}

/// Toma la titularidad de la moto; idempotente para el mismo titular
pub fn hold(
    changes: &mut Changeset,
    moto: &mut Motorcycle,
    holder: Holder,
    status: MotorcycleStatus,
    actor: &Actor,
) -> AppResult<()> {
    if moto.status == MotorcycleStatus::Sold {
        return Err(AppError::Conflict(format!(
            "motorcycle '{}' is sold and cannot enter a workflow",
            moto.id
        )));
    }
    if let Some(current) = moto.hold {
        if current != holder {
            return Err(AppError::Conflict(format!(
                "motorcycle '{}' is held by {}",
                moto.id, current
            )));
        }
    }

    moto.hold = Some(holder);
    set_status(changes, moto, status, actor);
    Ok(())
}

/// Devuelve la moto; sin efecto si no está tomada o la tiene otro titular
pub fn release(
    changes: &mut Changeset,
    moto: &mut Motorcycle,
    holder: Holder,
    status: MotorcycleStatus,
    actor: &Actor,
) -> ReleaseOutcome {
    match moto.hold {
        None => ReleaseOutcome::NotHeld,
        Some(current) if current != holder => {
            warn!(
                "🔐 {} intentó liberar la moto '{}' que pertenece a {}",
                holder, moto.id, current
            );
            ReleaseOutcome::HeldByOther(current)
        }
        Some(_) => {
            moto.hold = None;
            set_status(changes, moto, status, actor);
            ReleaseOutcome::Released
        }
    }
}

/// Pasa la titularidad de un workflow a otro sin soltar la moto
pub fn transfer(
    changes: &mut Changeset,
    moto: &mut Motorcycle,
    from: Holder,
    to: Holder,
    status: MotorcycleStatus,
    actor: &Actor,
) -> AppResult<()> {
    if !moto.is_held_by(from) {
        return Err(AppError::Conflict(format!(
            "motorcycle '{}' is not held by {}",
            moto.id, from
        )));
    }
    let previous = moto.status;
    moto.hold = Some(to);
    moto.status = status;
    changes.record_entry(
        StatusHistoryEntry::new(
            EntityKind::Motorcycle,
            moto.id,
            Some(previous.as_str()),
            status.as_str(),
            actor,
        )
        .with_note(format!("hold transferred from {} to {}", from, to)),
    );
    Ok(())
}

/// Incoherencia detectada entre la moto y sus workflows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum InvariantViolation {
    /// `in_repair`/`in_transit` sin un titular del tipo correspondiente
    StatusWithoutHold { status: MotorcycleStatus },
    HoldOnMissingWorkflow { holder: String },
    HoldOnTerminalWorkflow { holder: String },
    /// Workflow activo que no tiene la titularidad de la moto
    ActiveWorkflowWithoutHold { workflow: String },
    MultipleActiveWorkflows { workflows: Vec<String> },
}

/// Verifica que el estado de la moto refleje sus workflows activos
pub fn check_invariants(
    moto: &Motorcycle,
    repairs: &[Repair],
    inspections: &[Inspection],
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    let active: Vec<Holder> = repairs
        .iter()
        .filter(|r| !r.status.is_terminal())
        .map(|r| Holder::repair(r.id))
        .chain(
            inspections
                .iter()
                .filter(|i| !i.workflow_status.is_terminal())
                .map(|i| Holder::inspection(i.id)),
        )
        .collect();

    let expected_kind = match moto.status {
        MotorcycleStatus::InRepair => Some(HoldKind::Repair),
        MotorcycleStatus::InTransit => Some(HoldKind::Inspection),
        _ => None,
    };
    if let Some(kind) = expected_kind {
        if moto.hold.map(|h| h.kind) != Some(kind) {
            violations.push(InvariantViolation::StatusWithoutHold { status: moto.status });
        }
    }

    if let Some(holder) = moto.hold {
        let terminal = match holder.kind {
            HoldKind::Repair => repairs
                .iter()
                .find(|r| r.id == holder.id)
                .map(|r| r.status.is_terminal()),
            HoldKind::Inspection => inspections
                .iter()
                .find(|i| i.id == holder.id)
                .map(|i| i.workflow_status.is_terminal()),
        };
        match terminal {
            None => violations.push(InvariantViolation::HoldOnMissingWorkflow {
                holder: holder.to_string(),
            }),
            Some(true) => violations.push(InvariantViolation::HoldOnTerminalWorkflow {
                holder: holder.to_string(),
            }),
            Some(false) => {}
        }
    }

    for workflow in active.iter().filter(|w| moto.hold != Some(**w)) {
        violations.push(InvariantViolation::ActiveWorkflowWithoutHold {
            workflow: workflow.to_string(),
        });
    }

    if active.len() > 1 {
        violations.push(InvariantViolation::MultipleActiveWorkflows {
            workflows: active.iter().map(Holder::to_string).collect(),
        });
    }

    violations
}

/// Reporte de coherencia de una moto
#[derive(Debug, Clone, Serialize)]
pub struct InvariantReport {
    pub motorcycle_id: Uuid,
    pub status: MotorcycleStatus,
    pub hold: Option<Holder>,
    pub violations: Vec<InvariantViolation>,
}

/// Alta directa y consultas de motos
#[derive(Clone)]
pub struct MotorcycleRegister {
    ctx: WorkflowContext,
}

impl MotorcycleRegister {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn register(
        &self,
        actor: &Actor,
        details: MotorcycleDetails,
        acquisition_cost: Decimal,
    ) -> AppResult<Motorcycle> {
        AuthorizationService::require(
            AuthorizationService::can_register_motorcycle(actor),
            actor,
            "register motorcycles",
        )?;

        let mut changes = Changeset::new();
        let moto = stage_registration(&mut changes, details, acquisition_cost, actor);
        self.ctx.commit(changes).await?;

        info!("🏍️ Moto registrada: {} {} ({})", moto.brand, moto.model, moto.id);
        Ok(moto)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Motorcycle> {
        self.ctx.store.require_motorcycle(id).await
    }

    pub async fn list(&self) -> AppResult<Vec<Motorcycle>> {
        self.ctx.store.list_motorcycles().await
    }

    pub async fn invariants(&self, id: Uuid) -> AppResult<InvariantReport> {
        let moto = self.ctx.store.require_motorcycle(id).await?;
        let repairs = self.ctx.store.repairs_for_motorcycle(id).await?;
        let inspections = self.ctx.store.inspections_for_motorcycle(id).await?;
        let violations = check_invariants(&moto, &repairs, &inspections);

        if !violations.is_empty() {
            warn!("🚨 Moto '{}' con {} incoherencias", id, violations.len());
        }

        Ok(InvariantReport {
            motorcycle_id: moto.id,
            status: moto.status,
            hold: moto.hold,
            violations,
        })
    }
}

/// Crea la moto dentro del changeset (alta directa o contrato de compra)
pub fn stage_registration(
    changes: &mut Changeset,
    details: MotorcycleDetails,
    acquisition_cost: Decimal,
    actor: &Actor,
) -> Motorcycle {
    let mut moto = Motorcycle::register(details, acquisition_cost);
    changes.put(&mut moto);
    changes.record_status(
        EntityKind::Motorcycle,
        moto.id,
        None,
        moto.status.as_str(),
        actor,
    );
    moto
}
