//! Historial de estados (append-only)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use super::actor::{Actor, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "entity_kind", rename_all = "snake_case")]
pub enum EntityKind {
    Motorcycle,
    Inspection,
    Repair,
    RepairBill,
    ApprovalRequest,
    Contract,
}

text_enum!(EntityKind {
    Motorcycle => "motorcycle",
    Inspection => "inspection",
    Repair => "repair",
    RepairBill => "repair_bill",
    ApprovalRequest => "approval_request",
    Contract => "contract",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub actor_id: Uuid,
    pub actor_role: Role,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn new(
        entity_kind: EntityKind,
        entity_id: Uuid,
        from_status: Option<&str>,
        to_status: &str,
        actor: &Actor,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_kind,
            entity_id,
            from_status: from_status.map(str::to_string),
            to_status: to_status.to_string(),
            actor_id: actor.id,
            actor_role: actor.role,
            note: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Evento emitido tras confirmar una transición terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub status: String,
    pub actor_id: Uuid,
    pub actor_role: Role,
    pub summary: String,
    pub occurred_at: DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn new(
        entity_kind: EntityKind,
        entity_id: Uuid,
        status: &str,
        actor: &Actor,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            entity_kind,
            entity_id,
            status: status.to_string(),
            actor_id: actor.id,
            actor_role: actor.role,
            summary: summary.into(),
            occurred_at: Utc::now(),
        }
    }
}
