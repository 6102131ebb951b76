//! Modelo de ApprovalRequest
//!
//! Cadena genérica de aprobación en dos etapas secuenciales
//! (`pending_sales → pending_admin → approved`, o `rejected`).
//! El modelo solo conoce la autorización; qué hace cada tipo de propuesta
//! al aprobarse vive en los ejecutores (`services::executors`).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use super::actor::{Actor, Role};
use crate::utils::errors::{invalid_transition, validation_error, AppError, AppResult};

/// Tipos de propuesta que pasan por la cadena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "approval_kind", rename_all = "snake_case")]
pub enum ApprovalKind {
    ContractCreation,
    PriceChange,
    MotorcycleEdit,
    ContractEdit,
    RepairCreation,
    RepairEdit,
    RepairCompletion,
}

text_enum!(ApprovalKind {
    ContractCreation => "contract_creation",
    PriceChange => "price_change",
    MotorcycleEdit => "motorcycle_edit",
    ContractEdit => "contract_edit",
    RepairCreation => "repair_creation",
    RepairEdit => "repair_edit",
    RepairCompletion => "repair_completion",
});

impl ApprovalKind {
    pub const ALL: [ApprovalKind; 7] = [
        ApprovalKind::ContractCreation,
        ApprovalKind::PriceChange,
        ApprovalKind::MotorcycleEdit,
        ApprovalKind::ContractEdit,
        ApprovalKind::RepairCreation,
        ApprovalKind::RepairEdit,
        ApprovalKind::RepairCompletion,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
pub enum ApprovalStatus {
    PendingSales,
    PendingAdmin,
    Approved,
    Rejected,
}

text_enum!(ApprovalStatus {
    PendingSales => "pending_sales",
    PendingAdmin => "pending_admin",
    Approved => "approved",
    Rejected => "rejected",
});

impl ApprovalStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ApprovalStatus::PendingSales | ApprovalStatus::PendingAdmin)
    }

    pub fn next_states(&self) -> &'static [ApprovalStatus] {
        use ApprovalStatus::*;
        match self {
            PendingSales => &[PendingAdmin, Rejected],
            PendingAdmin => &[Approved, Rejected],
            Approved | Rejected => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "approval_priority", rename_all = "snake_case")]
pub enum ApprovalPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

text_enum!(ApprovalPriority {
    Low => "low",
    Normal => "normal",
    High => "high",
    Urgent => "urgent",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub approval_type: ApprovalKind,
    pub status: ApprovalStatus,
    pub priority: ApprovalPriority,
    pub requested_by: Uuid,
    pub requested_by_role: Role,
    /// Entidad principal a la que apunta la propuesta (búsqueda, no ownership)
    pub subject_id: Option<Uuid>,
    pub proposed_data: serde_json::Value,
    pub sales_approved_by: Option<Uuid>,
    pub sales_approved_at: Option<DateTime<Utc>>,
    pub sales_comments: Option<String>,
    pub admin_approved_by: Option<Uuid>,
    pub admin_approved_at: Option<DateTime<Utc>>,
    pub admin_comments: Option<String>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub last_execution_error: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn submit(
        approval_type: ApprovalKind,
        proposed_data: serde_json::Value,
        requested_by: &Actor,
        priority: ApprovalPriority,
        subject_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            approval_type,
            status: ApprovalStatus::PendingSales,
            priority,
            requested_by: requested_by.id,
            requested_by_role: requested_by.role,
            subject_id,
            proposed_data,
            sales_approved_by: None,
            sales_approved_at: None,
            sales_comments: None,
            admin_approved_by: None,
            admin_approved_at: None,
            admin_comments: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            last_execution_error: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn require_status(&self, expected: ApprovalStatus, attempted: &str) -> AppResult<()> {
        if self.status != expected {
            return Err(invalid_transition("approval request", self.status.as_str(), attempted));
        }
        Ok(())
    }

    fn require_role(actor: &Actor, role: Role, stage: &str) -> AppResult<()> {
        if actor.role != role {
            return Err(AppError::Unauthorized(format!(
                "{} stage requires role '{}', actor has '{}'",
                stage, role, actor.role
            )));
        }
        Ok(())
    }

    pub fn sales_approve(&mut self, actor: &Actor, comments: Option<String>) -> AppResult<ApprovalStatus> {
        self.require_status(ApprovalStatus::PendingSales, "sales-approve")?;
        Self::require_role(actor, Role::Sales, "sales approval")?;

        let previous = self.status;
        self.status = ApprovalStatus::PendingAdmin;
        self.sales_approved_by = Some(actor.id);
        self.sales_approved_at = Some(Utc::now());
        self.sales_comments = comments;
        Ok(previous)
    }

    /// Verifica estado y rol antes de invocar al ejecutor
    pub fn check_admin_approvable(&self, actor: &Actor) -> AppResult<()> {
        self.require_status(ApprovalStatus::PendingAdmin, "admin-approve")?;
        Self::require_role(actor, Role::Admin, "admin approval")
    }

    /// Marca aprobada; solo después de que el ejecutor terminó bien
    pub fn admin_approve(&mut self, actor: &Actor, comments: Option<String>) -> AppResult<ApprovalStatus> {
        self.check_admin_approvable(actor)?;

        let previous = self.status;
        self.status = ApprovalStatus::Approved;
        self.admin_approved_by = Some(actor.id);
        self.admin_approved_at = Some(Utc::now());
        self.admin_comments = comments;
        self.last_execution_error = None;
        Ok(previous)
    }

    pub fn record_execution_failure(&mut self, message: &str) {
        self.last_execution_error = Some(message.to_string());
    }

    pub fn reject(&mut self, actor: &Actor, reason: &str) -> AppResult<ApprovalStatus> {
        match (self.status, actor.role) {
            (ApprovalStatus::PendingSales, Role::Sales | Role::Admin) => {}
            (ApprovalStatus::PendingAdmin, Role::Admin) => {}
            (ApprovalStatus::PendingSales, _) | (ApprovalStatus::PendingAdmin, _) => {
                return Err(AppError::Unauthorized(format!(
                    "role '{}' cannot reject a request at '{}'",
                    actor.role, self.status
                )))
            }
            (status, _) => {
                return Err(invalid_transition("approval request", status.as_str(), "reject"))
            }
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(validation_error("reason", "a rejection reason is required"));
        }

        let previous = self.status;
        self.status = ApprovalStatus::Rejected;
        self.rejected_by = Some(actor.id);
        self.rejected_at = Some(Utc::now());
        self.rejection_reason = Some(reason.to_string());
        Ok(previous)
    }

    /// Pendiente desde hace más que `threshold`
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.status.is_pending() && now - self.created_at > threshold
    }
}
