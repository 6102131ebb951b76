//! Servicio de la cadena de aprobación
//!
//! Dos etapas secuenciales (ventas, luego admin) compartidas por todos los
//! tipos de propuesta. Al aprobar el admin se ejecuta el `ProposalExecutor`
//! del tipo dentro del mismo changeset; si falla, la solicitud queda en
//! `pending_admin` con el error anotado.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::executors::ExecutorRegistry;
use super::workflow_context::{ensure_expected, WorkflowContext};
use crate::models::{
    Actor, ApprovalKind, ApprovalPriority, ApprovalRequest, ApprovalStatus, EntityKind,
    WorkflowEvent,
};
use crate::repositories::Changeset;
use crate::utils::errors::{AppError, AppResult};

/// Valida la propuesta y la agenda en `pending_sales` dentro del changeset
pub fn stage_request(
    executors: &ExecutorRegistry,
    changes: &mut Changeset,
    kind: ApprovalKind,
    proposed_data: Value,
    actor: &Actor,
    priority: ApprovalPriority,
) -> AppResult<ApprovalRequest> {
    let subject_id = executors.get(kind)?.validate(&proposed_data)?;
    let mut request = ApprovalRequest::submit(kind, proposed_data, actor, priority, subject_id);
    changes.put(&mut request);
    changes.record_status(
        EntityKind::ApprovalRequest,
        request.id,
        None,
        request.status.as_str(),
        actor,
    );
    Ok(request)
}

#[derive(Clone)]
pub struct ApprovalService {
    ctx: WorkflowContext,
    executors: Arc<ExecutorRegistry>,
    stale_after: Duration,
}

impl ApprovalService {
    pub fn new(ctx: WorkflowContext, executors: Arc<ExecutorRegistry>, stale_after: Duration) -> Self {
        Self {
            ctx,
            executors,
            stale_after,
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ApprovalRequest> {
        self.ctx.store.require_approval(id).await
    }

    pub async fn list(&self, status: Option<ApprovalStatus>) -> AppResult<Vec<ApprovalRequest>> {
        self.ctx.store.list_approvals(status).await
    }

    /// Solicitudes pendientes hace más que el umbral (por defecto el configurado)
    pub async fn stale_requests(&self, threshold: Option<Duration>) -> AppResult<Vec<ApprovalRequest>> {
        let threshold = threshold.unwrap_or(self.stale_after);
        let now = Utc::now();
        let pending = self.ctx.store.list_approvals(None).await?;
        Ok(pending
            .into_iter()
            .filter(|r| r.is_stale(now, threshold))
            .collect())
    }

    pub async fn submit(
        &self,
        actor: &Actor,
        kind: ApprovalKind,
        proposed_data: Value,
        priority: ApprovalPriority,
    ) -> AppResult<ApprovalRequest> {
        let mut changes = Changeset::new();
        let request = stage_request(&self.executors, &mut changes, kind, proposed_data, actor, priority)?;
        self.ctx.commit(changes).await?;

        info!(
            "📝 Solicitud {} ({}) enviada por {} ({})",
            request.id, kind, actor.id, actor.role
        );
        Ok(request)
    }

    pub async fn sales_approve(
        &self,
        actor: &Actor,
        id: Uuid,
        comments: Option<String>,
        expected: Option<ApprovalStatus>,
    ) -> AppResult<ApprovalRequest> {
        let mut request = self.ctx.store.require_approval(id).await?;
        ensure_expected("approval request", request.status, expected)?;
        let previous = request.sales_approve(actor, comments)?;

        let mut changes = Changeset::new();
        changes.put(&mut request);
        changes.record_status(
            EntityKind::ApprovalRequest,
            request.id,
            Some(previous.as_str()),
            request.status.as_str(),
            actor,
        );
        self.ctx.commit(changes).await?;

        info!("🟡 Solicitud {} aprobada por ventas", id);
        Ok(request)
    }

    pub async fn admin_approve(
        &self,
        actor: &Actor,
        id: Uuid,
        comments: Option<String>,
        expected: Option<ApprovalStatus>,
    ) -> AppResult<ApprovalRequest> {
        let mut request = self.ctx.store.require_approval(id).await?;
        ensure_expected("approval request", request.status, expected)?;
        request.check_admin_approvable(actor)?;

        let executor = self.executors.get(request.approval_type)?;
        let mut changes = Changeset::new();

        if let Err(e) = executor
            .execute(&request, self.ctx.store.as_ref(), &mut changes, actor)
            .await
        {
            let message = e.to_string();
            error!(
                "💥 Ejecutor {} falló para la solicitud {}: {}",
                request.approval_type, id, message
            );
            self.record_failure(request, &message).await;
            return Err(AppError::ExecutorFailure {
                request_id: id,
                message,
            });
        }

        let previous = request.admin_approve(actor, comments)?;
        changes.put(&mut request);
        changes.record_status(
            EntityKind::ApprovalRequest,
            request.id,
            Some(previous.as_str()),
            request.status.as_str(),
            actor,
        );
        changes.emit(WorkflowEvent::new(
            EntityKind::ApprovalRequest,
            request.id,
            request.status.as_str(),
            actor,
            format!("{} request approved", request.approval_type),
        ));
        self.ctx.commit(changes).await?;

        info!("🟢 Solicitud {} ({}) aprobada y ejecutada", id, request.approval_type);
        Ok(request)
    }

    /// Anota el error del ejecutor; la solicitud sigue en `pending_admin`
    async fn record_failure(&self, mut request: ApprovalRequest, message: &str) {
        request.record_execution_failure(message);
        let mut changes = Changeset::new();
        changes.put(&mut request);
        if let Err(e) = self.ctx.store.commit(&changes).await {
            warn!(
                "⚠️ No se pudo anotar el error del ejecutor en la solicitud {}: {}",
                request.id, e
            );
        }
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: &str,
        expected: Option<ApprovalStatus>,
    ) -> AppResult<ApprovalRequest> {
        let mut request = self.ctx.store.require_approval(id).await?;
        ensure_expected("approval request", request.status, expected)?;
        let previous = request.reject(actor, reason)?;

        let executor = self.executors.get(request.approval_type)?;
        let mut changes = Changeset::new();
        executor
            .on_rejected(&request, self.ctx.store.as_ref(), &mut changes, actor)
            .await?;

        changes.put(&mut request);
        changes.record_status(
            EntityKind::ApprovalRequest,
            request.id,
            Some(previous.as_str()),
            request.status.as_str(),
            actor,
        );
        changes.emit(WorkflowEvent::new(
            EntityKind::ApprovalRequest,
            request.id,
            request.status.as_str(),
            actor,
            format!("{} request rejected: {}", request.approval_type, reason.trim()),
        ));
        self.ctx.commit(changes).await?;

        info!("🔴 Solicitud {} rechazada por {} ({})", id, actor.id, actor.role);
        Ok(request)
    }
}
