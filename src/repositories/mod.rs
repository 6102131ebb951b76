//! Capa de persistencia
//!
//! `WorkflowStore` es el puerto que usan los servicios: lecturas por id y un
//! único `commit` atómico con compare-and-swap por versión. Hay dos
//! implementaciones: `MemoryStore` (tests y modo sin base de datos) y
//! `PgStore` (PostgreSQL vía SQLx).

pub mod changeset;
pub mod memory_store;
pub mod pg_store;

pub use changeset::{Changeset, EntityWrite, Versioned};
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    ApprovalRequest, ApprovalStatus, Contract, Inspection, Motorcycle, Repair, RepairBill,
    StatusHistoryEntry,
};
use crate::utils::errors::{not_found_error, AppResult};

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn motorcycle(&self, id: Uuid) -> AppResult<Option<Motorcycle>>;
    async fn list_motorcycles(&self) -> AppResult<Vec<Motorcycle>>;

    async fn inspection(&self, id: Uuid) -> AppResult<Option<Inspection>>;
    async fn inspections_for_motorcycle(&self, motorcycle_id: Uuid) -> AppResult<Vec<Inspection>>;

    async fn repair(&self, id: Uuid) -> AppResult<Option<Repair>>;
    async fn repairs_for_motorcycle(&self, motorcycle_id: Uuid) -> AppResult<Vec<Repair>>;

    async fn bill(&self, id: Uuid) -> AppResult<Option<RepairBill>>;
    async fn bills_for_repair(&self, repair_id: Uuid) -> AppResult<Vec<RepairBill>>;

    async fn approval(&self, id: Uuid) -> AppResult<Option<ApprovalRequest>>;
    async fn list_approvals(&self, status: Option<ApprovalStatus>) -> AppResult<Vec<ApprovalRequest>>;

    async fn contract(&self, id: Uuid) -> AppResult<Option<Contract>>;

    /// Historial de estados de una entidad, en orden cronológico
    async fn history(&self, entity_id: Uuid) -> AppResult<Vec<StatusHistoryEntry>>;

    /// Aplica el changeset completo o devuelve `Conflict` sin aplicar nada
    async fn commit(&self, changes: &Changeset) -> AppResult<()>;

    async fn require_motorcycle(&self, id: Uuid) -> AppResult<Motorcycle> {
        self.motorcycle(id)
            .await?
            .ok_or_else(|| not_found_error("Motorcycle", &id))
    }

    async fn require_inspection(&self, id: Uuid) -> AppResult<Inspection> {
        self.inspection(id)
            .await?
            .ok_or_else(|| not_found_error("Inspection", &id))
    }

    async fn require_repair(&self, id: Uuid) -> AppResult<Repair> {
        self.repair(id)
            .await?
            .ok_or_else(|| not_found_error("Repair", &id))
    }

    async fn require_bill(&self, id: Uuid) -> AppResult<RepairBill> {
        self.bill(id)
            .await?
            .ok_or_else(|| not_found_error("RepairBill", &id))
    }

    async fn require_approval(&self, id: Uuid) -> AppResult<ApprovalRequest> {
        self.approval(id)
            .await?
            .ok_or_else(|| not_found_error("ApprovalRequest", &id))
    }

    async fn require_contract(&self, id: Uuid) -> AppResult<Contract> {
        self.contract(id)
            .await?
            .ok_or_else(|| not_found_error("Contract", &id))
    }
}
