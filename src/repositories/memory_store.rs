//! Store en memoria
//!
//! Todas las tablas viven detrás de un único `RwLock`, así que un commit
//! toma el lock de escritura una vez: verifica todas las versiones y recién
//! entonces aplica. Se usa en tests y cuando no hay `DATABASE_URL`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::changeset::{Changeset, EntityWrite, Versioned};
use super::WorkflowStore;
use crate::models::{
    ApprovalRequest, ApprovalStatus, Contract, Inspection, Motorcycle, Repair, RepairBill,
    StatusHistoryEntry,
};
use crate::utils::errors::{version_conflict, AppError, AppResult};

#[derive(Default)]
struct Tables {
    motorcycles: HashMap<Uuid, Motorcycle>,
    inspections: HashMap<Uuid, Inspection>,
    repairs: HashMap<Uuid, Repair>,
    bills: HashMap<Uuid, RepairBill>,
    approvals: HashMap<Uuid, ApprovalRequest>,
    contracts: HashMap<Uuid, Contract>,
    history: Vec<StatusHistoryEntry>,
}

impl Tables {
    fn check(&self, write: &EntityWrite) -> AppResult<()> {
        match write {
            EntityWrite::Motorcycle(m) => check_version(&self.motorcycles, m),
            EntityWrite::Inspection(i) => check_version(&self.inspections, i),
            EntityWrite::Repair(r) => check_version(&self.repairs, r),
            EntityWrite::Bill(b) => check_version(&self.bills, b),
            EntityWrite::Approval(a) => check_version(&self.approvals, a),
            EntityWrite::Contract(c) => check_version(&self.contracts, c),
        }
    }

    fn apply(&mut self, write: &EntityWrite) {
        match write {
            EntityWrite::Motorcycle(m) => {
                self.motorcycles.insert(m.id, m.clone());
            }
            EntityWrite::Inspection(i) => {
                self.inspections.insert(i.id, i.clone());
            }
            EntityWrite::Repair(r) => {
                self.repairs.insert(r.id, r.clone());
            }
            EntityWrite::Bill(b) => {
                self.bills.insert(b.id, b.clone());
            }
            EntityWrite::Approval(a) => {
                self.approvals.insert(a.id, a.clone());
            }
            EntityWrite::Contract(c) => {
                self.contracts.insert(c.id, c.clone());
            }
        }
    }
}

fn check_version<T: Versioned>(table: &HashMap<Uuid, T>, record: &T) -> AppResult<()> {
    let label = T::KIND.as_str();
    match (table.get(&record.id()), record.version()) {
        (None, 1) => Ok(()),
        (Some(_), 1) => Err(AppError::Conflict(format!(
            "{} '{}' already exists",
            label,
            record.id()
        ))),
        (Some(stored), version) if stored.version() == version - 1 => Ok(()),
        _ => Err(version_conflict(label, &record.id())),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn motorcycle(&self, id: Uuid) -> AppResult<Option<Motorcycle>> {
        Ok(self.tables.read().await.motorcycles.get(&id).cloned())
    }

    async fn list_motorcycles(&self) -> AppResult<Vec<Motorcycle>> {
        let tables = self.tables.read().await;
        let mut motorcycles: Vec<Motorcycle> = tables.motorcycles.values().cloned().collect();
        motorcycles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(motorcycles)
    }

    async fn inspection(&self, id: Uuid) -> AppResult<Option<Inspection>> {
        Ok(self.tables.read().await.inspections.get(&id).cloned())
    }

    async fn inspections_for_motorcycle(&self, motorcycle_id: Uuid) -> AppResult<Vec<Inspection>> {
        let tables = self.tables.read().await;
        Ok(tables
            .inspections
            .values()
            .filter(|i| i.motorcycle_id == motorcycle_id)
            .cloned()
            .collect())
    }

    async fn repair(&self, id: Uuid) -> AppResult<Option<Repair>> {
        Ok(self.tables.read().await.repairs.get(&id).cloned())
    }

    async fn repairs_for_motorcycle(&self, motorcycle_id: Uuid) -> AppResult<Vec<Repair>> {
        let tables = self.tables.read().await;
        Ok(tables
            .repairs
            .values()
            .filter(|r| r.motorcycle_id == motorcycle_id)
            .cloned()
            .collect())
    }

    async fn bill(&self, id: Uuid) -> AppResult<Option<RepairBill>> {
        Ok(self.tables.read().await.bills.get(&id).cloned())
    }

    async fn bills_for_repair(&self, repair_id: Uuid) -> AppResult<Vec<RepairBill>> {
        let tables = self.tables.read().await;
        let mut bills: Vec<RepairBill> = tables
            .bills
            .values()
            .filter(|b| b.repair_id == repair_id)
            .cloned()
            .collect();
        bills.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(bills)
    }

    async fn approval(&self, id: Uuid) -> AppResult<Option<ApprovalRequest>> {
        Ok(self.tables.read().await.approvals.get(&id).cloned())
    }

    async fn list_approvals(&self, status: Option<ApprovalStatus>) -> AppResult<Vec<ApprovalRequest>> {
        let tables = self.tables.read().await;
        let mut approvals: Vec<ApprovalRequest> = tables
            .approvals
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        approvals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(approvals)
    }

    async fn contract(&self, id: Uuid) -> AppResult<Option<Contract>> {
        Ok(self.tables.read().await.contracts.get(&id).cloned())
    }

    async fn history(&self, entity_id: Uuid) -> AppResult<Vec<StatusHistoryEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .history
            .iter()
            .filter(|h| h.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, changes: &Changeset) -> AppResult<()> {
        if let Some((kind, id)) = changes.duplicate_write() {
            return Err(AppError::Internal(format!(
                "{} '{}' written twice in one changeset",
                kind, id
            )));
        }

        let mut tables = self.tables.write().await;
        for write in changes.writes() {
            tables.check(write)?;
        }
        for write in changes.writes() {
            tables.apply(write);
        }
        tables.history.extend(changes.history().iter().cloned());

        debug!(
            "💾 Changeset aplicado en memoria: {} escrituras, {} filas de historial",
            changes.writes().len(),
            changes.history().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MotorcycleDetails;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = MemoryStore::new();
        let mut moto = Motorcycle::register(MotorcycleDetails::default(), Decimal::from(500));
        let mut cs = Changeset::new();
        cs.put(&mut moto);
        store.commit(&cs).await.unwrap();

        // una escritura válida y otra con versión vieja
        let mut fresh = Motorcycle::register(MotorcycleDetails::default(), Decimal::from(700));
        let mut stale = moto.clone();
        stale.version = 0;
        let mut cs = Changeset::new();
        cs.put(&mut fresh);
        cs.put(&mut stale);

        assert!(matches!(store.commit(&cs).await, Err(AppError::Conflict(_))));
        assert!(store.motorcycle(fresh.id).await.unwrap().is_none());
        assert_eq!(store.motorcycle(moto.id).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_second_writer_loses_race() {
        let store = MemoryStore::new();
        let mut moto = Motorcycle::register(MotorcycleDetails::default(), Decimal::from(500));
        let mut cs = Changeset::new();
        cs.put(&mut moto);
        store.commit(&cs).await.unwrap();

        let mut first = moto.clone();
        let mut second = moto.clone();

        let mut cs = Changeset::new();
        cs.put(&mut first);
        store.commit(&cs).await.unwrap();

        let mut cs = Changeset::new();
        cs.put(&mut second);
        assert!(matches!(store.commit(&cs).await, Err(AppError::Conflict(_))));
    }
}
