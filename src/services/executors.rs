//! Ejecutores de propuestas
//!
//! La cadena de aprobación solo conoce el trait `ProposalExecutor`. Cada tipo
//! de propuesta registra su ejecutor en el `ExecutorRegistry`: valida el
//! payload al enviarse y, al aprobarlo el admin, escribe sus efectos en el
//! mismo changeset que la aprobación.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::motorcycle_register::stage_registration;
use super::pricing_service::{apply_price, PriceInput};
use super::repair_service::{stage_assignment, stage_completion};
use crate::models::{
    Actor, ApprovalKind, ApprovalRequest, Contract, ContractStatus, ContractType, EntityKind,
    MotorcycleDetails, MotorcycleStatus, RepairStatus, StatusHistoryEntry, WorkItem, WorkSummary,
};
use crate::repositories::{Changeset, WorkflowStore};
use crate::utils::errors::{invalid_transition, validation_error, AppError, AppResult};

#[async_trait]
pub trait ProposalExecutor: Send + Sync {
    fn kind(&self) -> ApprovalKind;

    /// Valida el payload; devuelve la entidad a la que apunta, si existe
    fn validate(&self, data: &Value) -> AppResult<Option<Uuid>>;

    /// Aplica la propuesta aprobada dentro del changeset de la aprobación
    async fn execute(
        &self,
        request: &ApprovalRequest,
        store: &dyn WorkflowStore,
        changes: &mut Changeset,
        actor: &Actor,
    ) -> AppResult<()>;

    async fn on_rejected(
        &self,
        _request: &ApprovalRequest,
        _store: &dyn WorkflowStore,
        _changes: &mut Changeset,
        _actor: &Actor,
    ) -> AppResult<()> {
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(data: &Value) -> AppResult<T> {
    serde_json::from_value(data.clone())
        .map_err(|e| validation_error("proposed_data", &e.to_string()))
}

fn require_positive(field: &'static str, value: Decimal) -> AppResult<()> {
    if value <= Decimal::ZERO {
        return Err(validation_error(field, "must be greater than zero"));
    }
    Ok(())
}

// ---------------------------------------------------------------- contratos

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractCreationData {
    pub contract_type: ContractType,
    pub party_id: Uuid,
    pub amount: Decimal,
    /// Moto existente (venta, o compra de una moto ya registrada)
    #[serde(default)]
    pub motorcycle_id: Option<Uuid>,
    /// Moto nueva a registrar con la compra
    #[serde(default)]
    pub motorcycle: Option<MotorcycleDetails>,
}

impl ContractCreationData {
    fn check(&self) -> AppResult<()> {
        require_positive("amount", self.amount)?;
        match (self.contract_type, &self.motorcycle_id, &self.motorcycle) {
            (ContractType::Purchase, Some(_), None) | (ContractType::Purchase, None, Some(_)) => Ok(()),
            (ContractType::Purchase, _, _) => Err(validation_error(
                "motorcycle",
                "a purchase needs either motorcycle_id or motorcycle details",
            )),
            (ContractType::Sale, Some(_), None) => Ok(()),
            (ContractType::Sale, _, _) => Err(validation_error(
                "motorcycle_id",
                "a sale needs the motorcycle_id of a stocked motorcycle",
            )),
        }
    }
}

pub struct ContractCreationExecutor;

#[async_trait]
impl ProposalExecutor for ContractCreationExecutor {
    fn kind(&self) -> ApprovalKind {
        ApprovalKind::ContractCreation
    }

    fn validate(&self, data: &Value) -> AppResult<Option<Uuid>> {
        let data: ContractCreationData = parse(data)?;
        data.check()?;
        Ok(data.motorcycle_id)
    }

    async fn execute(
        &self,
        request: &ApprovalRequest,
        store: &dyn WorkflowStore,
        changes: &mut Changeset,
        actor: &Actor,
    ) -> AppResult<()> {
        let data: ContractCreationData = parse(&request.proposed_data)?;
        data.check()?;

        let motorcycle_id = match (data.contract_type, data.motorcycle_id, data.motorcycle) {
            (ContractType::Purchase, None, Some(details)) => {
                stage_registration(changes, details, data.amount, actor).id
            }
            (ContractType::Purchase, Some(id), _) => store.require_motorcycle(id).await?.id,
            (ContractType::Sale, Some(id), _) => {
                let mut moto = store.require_motorcycle(id).await?;
                if let Some(holder) = moto.hold {
                    return Err(AppError::Conflict(format!(
                        "motorcycle '{}' is held by {}",
                        moto.id, holder
                    )));
                }
                if moto.status != MotorcycleStatus::InStock {
                    return Err(invalid_transition("motorcycle", moto.status.as_str(), "be sold"));
                }
                changes.record_status(
                    EntityKind::Motorcycle,
                    moto.id,
                    Some(moto.status.as_str()),
                    MotorcycleStatus::Sold.as_str(),
                    actor,
                );
                moto.status = MotorcycleStatus::Sold;
                changes.put(&mut moto);
                moto.id
            }
            _ => return Err(validation_error("motorcycle_id", "motorcycle reference missing")),
        };

        let mut contract = Contract::new(
            data.contract_type,
            motorcycle_id,
            data.party_id,
            data.amount,
            request.id,
        );
        changes.put(&mut contract);
        changes.record_status(
            EntityKind::Contract,
            contract.id,
            None,
            contract.status.as_str(),
            actor,
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractEditAction {
    Edit,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractEditData {
    pub contract_id: Uuid,
    pub action: ContractEditAction,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

impl ContractEditData {
    fn check(&self) -> AppResult<()> {
        match (self.action, self.amount) {
            (ContractEditAction::Edit, Some(amount)) => require_positive("amount", amount),
            (ContractEditAction::Edit, None) => {
                Err(validation_error("amount", "an edit needs the new amount"))
            }
            (ContractEditAction::Delete, _) => Ok(()),
        }
    }
}

pub struct ContractEditExecutor;

#[async_trait]
impl ProposalExecutor for ContractEditExecutor {
    fn kind(&self) -> ApprovalKind {
        ApprovalKind::ContractEdit
    }

    fn validate(&self, data: &Value) -> AppResult<Option<Uuid>> {
        let data: ContractEditData = parse(data)?;
        data.check()?;
        Ok(Some(data.contract_id))
    }

    async fn execute(
        &self,
        request: &ApprovalRequest,
        store: &dyn WorkflowStore,
        changes: &mut Changeset,
        actor: &Actor,
    ) -> AppResult<()> {
        let data: ContractEditData = parse(&request.proposed_data)?;
        data.check()?;

        let mut contract = store.require_contract(data.contract_id).await?;
        if contract.status == ContractStatus::Cancelled {
            return Err(invalid_transition("contract", contract.status.as_str(), "be changed"));
        }

        match (data.action, data.amount) {
            (ContractEditAction::Edit, Some(amount)) => {
                contract.amount = amount;
            }
            (ContractEditAction::Delete, _) => {
                changes.record_status(
                    EntityKind::Contract,
                    contract.id,
                    Some(contract.status.as_str()),
                    ContractStatus::Cancelled.as_str(),
                    actor,
                );
                contract.status = ContractStatus::Cancelled;

                if contract.contract_type == ContractType::Sale {
                    let mut moto = store.require_motorcycle(contract.motorcycle_id).await?;
                    if moto.status == MotorcycleStatus::Sold {
                        changes.record_status(
                            EntityKind::Motorcycle,
                            moto.id,
                            Some(moto.status.as_str()),
                            MotorcycleStatus::InStock.as_str(),
                            actor,
                        );
                        moto.status = MotorcycleStatus::InStock;
                        changes.put(&mut moto);
                    }
                }
            }
            (ContractEditAction::Edit, None) => {
                return Err(validation_error("amount", "an edit needs the new amount"))
            }
        }

        changes.put(&mut contract);
        Ok(())
    }
}

// ------------------------------------------------------------ moto y precio

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChangeData {
    pub motorcycle_id: Uuid,
    pub sale_price: Decimal,
}

pub struct PriceChangeExecutor;

#[async_trait]
impl ProposalExecutor for PriceChangeExecutor {
    fn kind(&self) -> ApprovalKind {
        ApprovalKind::PriceChange
    }

    fn validate(&self, data: &Value) -> AppResult<Option<Uuid>> {
        let data: PriceChangeData = parse(data)?;
        require_positive("sale_price", data.sale_price)?;
        Ok(Some(data.motorcycle_id))
    }

    async fn execute(
        &self,
        request: &ApprovalRequest,
        store: &dyn WorkflowStore,
        changes: &mut Changeset,
        _actor: &Actor,
    ) -> AppResult<()> {
        let data: PriceChangeData = parse(&request.proposed_data)?;
        let mut moto = store.require_motorcycle(data.motorcycle_id).await?;
        if moto.status == MotorcycleStatus::Sold {
            return Err(invalid_transition("motorcycle", moto.status.as_str(), "change its price"));
        }
        apply_price(&mut moto, PriceInput::SalePrice(data.sale_price))?;
        changes.put(&mut moto);
        Ok(())
    }
}

/// Solo campos descriptivos: `status` y precios no son editables por aquí
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotorcycleEditData {
    pub motorcycle_id: Uuid,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub chassis_number: Option<String>,
}

impl MotorcycleEditData {
    fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.model.is_none()
            && self.year.is_none()
            && self.registration_number.is_none()
            && self.chassis_number.is_none()
    }
}

pub struct MotorcycleEditExecutor;

#[async_trait]
impl ProposalExecutor for MotorcycleEditExecutor {
    fn kind(&self) -> ApprovalKind {
        ApprovalKind::MotorcycleEdit
    }

    fn validate(&self, data: &Value) -> AppResult<Option<Uuid>> {
        let data: MotorcycleEditData = parse(data)?;
        if data.is_empty() {
            return Err(validation_error("proposed_data", "nothing to edit"));
        }
        Ok(Some(data.motorcycle_id))
    }

    async fn execute(
        &self,
        request: &ApprovalRequest,
        store: &dyn WorkflowStore,
        changes: &mut Changeset,
        _actor: &Actor,
    ) -> AppResult<()> {
        let data: MotorcycleEditData = parse(&request.proposed_data)?;
        let mut moto = store.require_motorcycle(data.motorcycle_id).await?;
        if let Some(holder) = moto.hold {
            return Err(AppError::Conflict(format!(
                "motorcycle '{}' is held by {} and cannot be edited",
                moto.id, holder
            )));
        }

        if let Some(brand) = data.brand {
            moto.brand = brand;
        }
        if let Some(model) = data.model {
            moto.model = model;
        }
        if let Some(year) = data.year {
            moto.year = Some(year);
        }
        if let Some(registration) = data.registration_number {
            moto.registration_number = Some(registration);
        }
        if let Some(chassis) = data.chassis_number {
            moto.chassis_number = Some(chassis);
        }
        changes.put(&mut moto);
        Ok(())
    }
}

// --------------------------------------------------------------- reparación

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairCreationData {
    pub motorcycle_id: Uuid,
    #[serde(default)]
    pub mechanic_id: Option<Uuid>,
    pub description: String,
}

pub struct RepairCreationExecutor;

#[async_trait]
impl ProposalExecutor for RepairCreationExecutor {
    fn kind(&self) -> ApprovalKind {
        ApprovalKind::RepairCreation
    }

    fn validate(&self, data: &Value) -> AppResult<Option<Uuid>> {
        let data: RepairCreationData = parse(data)?;
        if data.description.trim().is_empty() {
            return Err(validation_error("description", "a repair needs a description"));
        }
        Ok(Some(data.motorcycle_id))
    }

    async fn execute(
        &self,
        request: &ApprovalRequest,
        store: &dyn WorkflowStore,
        changes: &mut Changeset,
        actor: &Actor,
    ) -> AppResult<()> {
        let data: RepairCreationData = parse(&request.proposed_data)?;
        stage_assignment(
            store,
            changes,
            actor,
            data.motorcycle_id,
            data.mechanic_id,
            data.description,
        )
        .await?;
        Ok(())
    }
}

/// Costos propuestos para una reparación
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairEditData {
    pub repair_id: Uuid,
    pub work_items: Vec<WorkItem>,
    /// Total agregado al momento del envío; debe coincidir con los ítems
    #[serde(default)]
    pub total_cost: Option<Decimal>,
}

impl RepairEditData {
    pub fn summary(&self) -> AppResult<WorkSummary> {
        let summary = WorkSummary::from_items(&self.work_items)?;
        if let Some(total) = self.total_cost {
            if total != summary.total_cost {
                return Err(validation_error(
                    "total_cost",
                    "total_cost does not match the work items",
                ));
            }
        }
        Ok(summary)
    }
}

pub struct RepairEditExecutor;

#[async_trait]
impl ProposalExecutor for RepairEditExecutor {
    fn kind(&self) -> ApprovalKind {
        ApprovalKind::RepairEdit
    }

    fn validate(&self, data: &Value) -> AppResult<Option<Uuid>> {
        let data: RepairEditData = parse(data)?;
        data.summary()?;
        Ok(Some(data.repair_id))
    }

    async fn execute(
        &self,
        request: &ApprovalRequest,
        store: &dyn WorkflowStore,
        changes: &mut Changeset,
        actor: &Actor,
    ) -> AppResult<()> {
        let data: RepairEditData = parse(&request.proposed_data)?;
        let summary = data.summary()?;
        let mut repair = store.require_repair(data.repair_id).await?;

        match repair.status {
            RepairStatus::AwaitingDetailsApproval => {
                if repair.details_request_id != Some(request.id) {
                    return Err(invalid_transition(
                        "repair",
                        "awaiting a different details request",
                        "apply this edit",
                    ));
                }
                let previous = repair.approve_details(&summary)?;
                changes.record_status(
                    EntityKind::Repair,
                    repair.id,
                    Some(previous.as_str()),
                    repair.status.as_str(),
                    actor,
                );
            }
            RepairStatus::DetailsApproved | RepairStatus::Completed => {
                repair.edit_costs(&summary)?;
                changes.record_entry(
                    StatusHistoryEntry::new(
                        EntityKind::Repair,
                        repair.id,
                        Some(repair.status.as_str()),
                        repair.status.as_str(),
                        actor,
                    )
                    .with_note(format!("costs edited, total {}", summary.total_cost)),
                );
            }
            status => return Err(invalid_transition("repair", status.as_str(), "apply a cost edit")),
        }

        changes.put(&mut repair);
        Ok(())
    }

    async fn on_rejected(
        &self,
        request: &ApprovalRequest,
        store: &dyn WorkflowStore,
        changes: &mut Changeset,
        actor: &Actor,
    ) -> AppResult<()> {
        let data: RepairEditData = parse(&request.proposed_data)?;
        let Some(mut repair) = store.repair(data.repair_id).await? else {
            return Ok(());
        };

        if repair.status == RepairStatus::AwaitingDetailsApproval
            && repair.details_request_id == Some(request.id)
        {
            let previous = repair.reopen_after_rejection()?;
            changes.record_status(
                EntityKind::Repair,
                repair.id,
                Some(previous.as_str()),
                repair.status.as_str(),
                actor,
            );
            changes.put(&mut repair);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairCompletionData {
    pub repair_id: Uuid,
}

pub struct RepairCompletionExecutor;

#[async_trait]
impl ProposalExecutor for RepairCompletionExecutor {
    fn kind(&self) -> ApprovalKind {
        ApprovalKind::RepairCompletion
    }

    fn validate(&self, data: &Value) -> AppResult<Option<Uuid>> {
        let data: RepairCompletionData = parse(data)?;
        Ok(Some(data.repair_id))
    }

    async fn execute(
        &self,
        request: &ApprovalRequest,
        store: &dyn WorkflowStore,
        changes: &mut Changeset,
        actor: &Actor,
    ) -> AppResult<()> {
        let data: RepairCompletionData = parse(&request.proposed_data)?;
        let mut repair = store.require_repair(data.repair_id).await?;
        let previous = repair.complete()?;
        stage_completion(store, changes, actor, &mut repair, previous).await
    }
}

// ----------------------------------------------------------------- registro

/// Ejecutores indexados por tipo de propuesta
#[derive(Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<ApprovalKind, Arc<dyn ProposalExecutor>>,
}

impl ExecutorRegistry {
    pub fn empty() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    pub fn register<E>(&mut self, executor: E)
    where
        E: ProposalExecutor + 'static,
    {
        self.executors.insert(executor.kind(), Arc::new(executor));
    }

    pub fn get(&self, kind: ApprovalKind) -> AppResult<Arc<dyn ProposalExecutor>> {
        self.executors
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::BadRequest(format!("no executor registered for '{}'", kind)))
    }

    pub fn kinds(&self) -> Vec<ApprovalKind> {
        ApprovalKind::ALL
            .into_iter()
            .filter(|k| self.executors.contains_key(k))
            .collect()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ContractCreationExecutor);
        registry.register(ContractEditExecutor);
        registry.register(PriceChangeExecutor);
        registry.register(MotorcycleEditExecutor);
        registry.register(RepairCreationExecutor);
        registry.register(RepairEditExecutor);
        registry.register(RepairCompletionExecutor);
        registry
    }
}
