//! Unidad de trabajo atómica
//!
//! Un `Changeset` junta todas las escrituras de una transición (entidad
//! principal + efectos cruzados), las filas de historial y los eventos a
//! notificar. El store lo aplica completo o no aplica nada.
//!
//! Cada entidad lleva un `version`: una escritura con versión 1 es un insert,
//! una con versión n > 1 exige que la versión guardada sea n - 1.

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    Actor, ApprovalRequest, Contract, EntityKind, Inspection, Motorcycle, Repair, RepairBill,
    StatusHistoryEntry, WorkflowEvent,
};

/// Entidad con control de concurrencia optimista
pub trait Versioned: Clone {
    const KIND: EntityKind;

    fn id(&self) -> Uuid;
    fn version(&self) -> i64;
    fn bump(&mut self);
}

macro_rules! versioned {
    ($ty:ty, $kind:expr) => {
        impl Versioned for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> Uuid {
                self.id
            }

            fn version(&self) -> i64 {
                self.version
            }

            fn bump(&mut self) {
                self.version += 1;
                self.updated_at = Utc::now();
            }
        }
    };
}

versioned!(Motorcycle, EntityKind::Motorcycle);
versioned!(Inspection, EntityKind::Inspection);
versioned!(Repair, EntityKind::Repair);
versioned!(RepairBill, EntityKind::RepairBill);
versioned!(ApprovalRequest, EntityKind::ApprovalRequest);
versioned!(Contract, EntityKind::Contract);

/// Escritura de una entidad ya versionada
#[derive(Debug, Clone)]
pub enum EntityWrite {
    Motorcycle(Motorcycle),
    Inspection(Inspection),
    Repair(Repair),
    Bill(RepairBill),
    Approval(ApprovalRequest),
    Contract(Contract),
}

impl EntityWrite {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityWrite::Motorcycle(_) => EntityKind::Motorcycle,
            EntityWrite::Inspection(_) => EntityKind::Inspection,
            EntityWrite::Repair(_) => EntityKind::Repair,
            EntityWrite::Bill(_) => EntityKind::RepairBill,
            EntityWrite::Approval(_) => EntityKind::ApprovalRequest,
            EntityWrite::Contract(_) => EntityKind::Contract,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            EntityWrite::Motorcycle(m) => m.id,
            EntityWrite::Inspection(i) => i.id,
            EntityWrite::Repair(r) => r.id,
            EntityWrite::Bill(b) => b.id,
            EntityWrite::Approval(a) => a.id,
            EntityWrite::Contract(c) => c.id,
        }
    }

    pub fn version(&self) -> i64 {
        match self {
            EntityWrite::Motorcycle(m) => m.version,
            EntityWrite::Inspection(i) => i.version,
            EntityWrite::Repair(r) => r.version,
            EntityWrite::Bill(b) => b.version,
            EntityWrite::Approval(a) => a.version,
            EntityWrite::Contract(c) => c.version,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.version() == 1
    }
}

impl From<Motorcycle> for EntityWrite {
    fn from(value: Motorcycle) -> Self {
        EntityWrite::Motorcycle(value)
    }
}

impl From<Inspection> for EntityWrite {
    fn from(value: Inspection) -> Self {
        EntityWrite::Inspection(value)
    }
}

impl From<Repair> for EntityWrite {
    fn from(value: Repair) -> Self {
        EntityWrite::Repair(value)
    }
}

impl From<RepairBill> for EntityWrite {
    fn from(value: RepairBill) -> Self {
        EntityWrite::Bill(value)
    }
}

impl From<ApprovalRequest> for EntityWrite {
    fn from(value: ApprovalRequest) -> Self {
        EntityWrite::Approval(value)
    }
}

impl From<Contract> for EntityWrite {
    fn from(value: Contract) -> Self {
        EntityWrite::Contract(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Changeset {
    writes: Vec<EntityWrite>,
    history: Vec<StatusHistoryEntry>,
    events: Vec<WorkflowEvent>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incrementa la versión de la entidad y agenda su escritura.
    /// Cada entidad debe agregarse una sola vez por changeset.
    pub fn put<T>(&mut self, entity: &mut T)
    where
        T: Versioned + Into<EntityWrite>,
    {
        entity.bump();
        self.writes.push(entity.clone().into());
    }

    /// Agrega una fila de historial de estado
    pub fn record_status(
        &mut self,
        kind: EntityKind,
        entity_id: Uuid,
        from: Option<&str>,
        to: &str,
        actor: &Actor,
    ) {
        self.history
            .push(StatusHistoryEntry::new(kind, entity_id, from, to, actor));
    }

    pub fn record_entry(&mut self, entry: StatusHistoryEntry) {
        self.history.push(entry);
    }

    pub fn emit(&mut self, event: WorkflowEvent) {
        self.events.push(event);
    }

    pub fn writes(&self) -> &[EntityWrite] {
        &self.writes
    }

    pub fn history(&self) -> &[StatusHistoryEntry] {
        &self.history
    }

    pub fn events(&self) -> &[WorkflowEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.history.is_empty()
    }

    /// Verifica que ninguna entidad aparezca dos veces
    pub fn duplicate_write(&self) -> Option<(EntityKind, Uuid)> {
        let mut seen = std::collections::HashSet::new();
        self.writes
            .iter()
            .map(|w| (w.kind(), w.id()))
            .find(|key| !seen.insert(*key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MotorcycleDetails, Role};
    use rust_decimal::Decimal;

    #[test]
    fn test_put_bumps_version() {
        let mut moto = Motorcycle::register(MotorcycleDetails::default(), Decimal::from(1000));
        let mut cs = Changeset::new();
        cs.put(&mut moto);

        assert_eq!(moto.version, 1);
        assert!(cs.writes()[0].is_insert());
        assert_eq!(cs.writes()[0].kind(), EntityKind::Motorcycle);
    }

    #[test]
    fn test_duplicate_write_detection() {
        let mut moto = Motorcycle::register(MotorcycleDetails::default(), Decimal::from(1000));
        let mut cs = Changeset::new();
        cs.put(&mut moto);
        assert!(cs.duplicate_write().is_none());
        cs.put(&mut moto);
        assert_eq!(cs.duplicate_write(), Some((EntityKind::Motorcycle, moto.id)));

        let actor = Actor::new(Uuid::new_v4(), Role::Admin);
        cs.record_status(EntityKind::Motorcycle, moto.id, None, "in_stock", &actor);
        assert_eq!(cs.history().len(), 1);
    }
}
