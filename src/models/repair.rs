//! Modelo de Repair
//!
//! Trabajo de mecánica desde la asignación hasta el cierre:
//! `pending → in_progress → awaiting_details_approval → details_approved → completed`,
//! con `cancelled` como terminal alternativo.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use crate::utils::errors::{invalid_transition, validation_error, AppResult};

/// Estado de la reparación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "repair_status", rename_all = "snake_case")]
pub enum RepairStatus {
    Pending,
    InProgress,
    AwaitingDetailsApproval,
    DetailsApproved,
    Completed,
    Cancelled,
}

text_enum!(RepairStatus {
    Pending => "pending",
    InProgress => "in_progress",
    AwaitingDetailsApproval => "awaiting_details_approval",
    DetailsApproved => "details_approved",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl RepairStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RepairStatus::Completed | RepairStatus::Cancelled)
    }

    /// Aristas dirigidas permitidas desde este estado
    pub fn next_states(&self) -> &'static [RepairStatus] {
        use RepairStatus::*;
        match self {
            Pending => &[InProgress, Cancelled],
            InProgress => &[AwaitingDetailsApproval, Cancelled],
            // in_progress solo cuando la solicitud de detalles es rechazada
            AwaitingDetailsApproval => &[DetailsApproved, InProgress, Cancelled],
            DetailsApproved => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_become(&self, next: RepairStatus) -> bool {
        self.next_states().contains(&next)
    }

    /// El costo total es autoritativo a partir de awaiting_details_approval
    pub fn has_authoritative_cost(&self) -> bool {
        matches!(
            self,
            RepairStatus::AwaitingDetailsApproval
                | RepairStatus::DetailsApproved
                | RepairStatus::Completed
        )
    }
}

/// Repuesto usado; `cost` es el costo de la línea completa
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparePart {
    pub name: String,
    pub quantity: i32,
    pub cost: Decimal,
}

/// Ítem de trabajo reportado por el mecánico
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub description: String,
    #[serde(default)]
    pub labor_cost: Decimal,
    #[serde(default)]
    pub spare_parts: Vec<SparePart>,
}

/// Resultado de agregar los ítems de trabajo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSummary {
    pub work_description: String,
    pub spare_parts: Vec<SparePart>,
    pub labor_cost: Decimal,
    pub spare_parts_cost: Decimal,
    pub total_cost: Decimal,
}

impl WorkSummary {
    /// Agrega los ítems de trabajo; exige al menos una descripción no vacía
    pub fn from_items(items: &[WorkItem]) -> AppResult<Self> {
        let descriptions: Vec<&str> = items
            .iter()
            .map(|item| item.description.trim())
            .filter(|d| !d.is_empty())
            .collect();

        if descriptions.is_empty() {
            return Err(validation_error(
                "work_items",
                "at least one work item needs a description",
            ));
        }

        let spare_parts: Vec<SparePart> = items
            .iter()
            .flat_map(|item| item.spare_parts.iter().cloned())
            .collect();

        if let Some(part) = spare_parts
            .iter()
            .find(|p| p.cost < Decimal::ZERO || p.quantity <= 0)
        {
            return Err(validation_error(
                "spare_parts",
                &format!("spare part '{}' needs a positive quantity and a non-negative cost", part.name),
            ));
        }

        let labor_cost: Decimal = items.iter().map(|item| item.labor_cost).sum();
        if labor_cost < Decimal::ZERO {
            return Err(validation_error("labor_cost", "labor cost cannot be negative"));
        }

        let spare_parts_cost: Decimal = spare_parts.iter().map(|p| p.cost).sum();

        Ok(Self {
            work_description: descriptions.join("; "),
            total_cost: spare_parts_cost + labor_cost,
            spare_parts,
            labor_cost,
            spare_parts_cost,
        })
    }
}

/// Repair principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repair {
    pub id: Uuid,
    pub motorcycle_id: Uuid,
    pub mechanic_id: Option<Uuid>,
    pub inspection_id: Option<Uuid>,
    pub status: RepairStatus,
    pub description: String,
    pub work_description: Option<String>,
    pub issues_found: Vec<String>,
    pub proof_of_work: Vec<String>,
    pub spare_parts: Vec<SparePart>,
    pub labor_cost: Decimal,
    pub total_cost: Decimal,
    /// Última solicitud `repair_edit` abierta para esta reparación
    pub details_request_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repair {
    pub fn open(
        motorcycle_id: Uuid,
        mechanic_id: Option<Uuid>,
        inspection_id: Option<Uuid>,
        description: String,
        issues_found: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            motorcycle_id,
            mechanic_id,
            inspection_id,
            status: RepairStatus::Pending,
            description,
            work_description: None,
            issues_found,
            proof_of_work: Vec::new(),
            spare_parts: Vec::new(),
            labor_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            details_request_id: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.mechanic_id == Some(user_id)
    }

    fn transition(&mut self, next: RepairStatus, attempted: &str) -> AppResult<RepairStatus> {
        if !self.status.can_become(next) {
            return Err(invalid_transition("repair", self.status.as_str(), attempted));
        }
        let previous = self.status;
        self.status = next;
        Ok(previous)
    }

    pub fn assign_mechanic(&mut self, mechanic_id: Uuid) -> AppResult<()> {
        if self.status != RepairStatus::Pending {
            return Err(invalid_transition("repair", self.status.as_str(), "assign a mechanic"));
        }
        self.mechanic_id = Some(mechanic_id);
        Ok(())
    }

    pub fn start_work(&mut self) -> AppResult<RepairStatus> {
        let previous = self.transition(RepairStatus::InProgress, "start work")?;
        self.started_at = Some(Utc::now());
        Ok(previous)
    }

    /// Registra los detalles de trabajo y queda esperando la aprobación
    pub fn record_details(
        &mut self,
        summary: &WorkSummary,
        issues_found: Vec<String>,
        proof_of_work: Vec<String>,
        request_id: Uuid,
    ) -> AppResult<RepairStatus> {
        let previous = self.transition(RepairStatus::AwaitingDetailsApproval, "register details")?;
        self.apply_costs(summary);
        if !issues_found.is_empty() {
            self.issues_found = issues_found;
        }
        self.proof_of_work = proof_of_work;
        self.details_request_id = Some(request_id);
        Ok(previous)
    }

    pub fn approve_details(&mut self, summary: &WorkSummary) -> AppResult<RepairStatus> {
        let previous = self.transition(RepairStatus::DetailsApproved, "approve details")?;
        self.apply_costs(summary);
        Ok(previous)
    }

    /// Vuelve a in_progress cuando la solicitud de detalles fue rechazada
    pub fn reopen_after_rejection(&mut self) -> AppResult<RepairStatus> {
        let previous = self.transition(RepairStatus::InProgress, "return to work")?;
        self.details_request_id = None;
        Ok(previous)
    }

    /// Edición de costos aprobada sobre una reparación ya aprobada
    pub fn edit_costs(&mut self, summary: &WorkSummary) -> AppResult<()> {
        if !matches!(self.status, RepairStatus::DetailsApproved | RepairStatus::Completed) {
            return Err(invalid_transition("repair", self.status.as_str(), "edit costs"));
        }
        self.apply_costs(summary);
        Ok(())
    }

    pub fn complete(&mut self) -> AppResult<RepairStatus> {
        let previous = self.transition(RepairStatus::Completed, "complete")?;
        self.completed_at = Some(Utc::now());
        Ok(previous)
    }

    pub fn cancel(&mut self) -> AppResult<RepairStatus> {
        let previous = self.transition(RepairStatus::Cancelled, "cancel")?;
        self.cancelled_at = Some(Utc::now());
        Ok(previous)
    }

    fn apply_costs(&mut self, summary: &WorkSummary) {
        self.work_description = Some(summary.work_description.clone());
        self.spare_parts = summary.spare_parts.clone();
        self.labor_cost = summary.labor_cost;
        self.total_cost = summary.total_cost;
    }

    pub fn spare_parts_cost(&self) -> Decimal {
        self.spare_parts.iter().map(|p| p.cost).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::AppError;

    fn item(description: &str, labor: i64, parts: &[(&str, i64)]) -> WorkItem {
        WorkItem {
            description: description.to_string(),
            labor_cost: Decimal::from(labor),
            spare_parts: parts
                .iter()
                .map(|(name, cost)| SparePart {
                    name: name.to_string(),
                    quantity: 1,
                    cost: Decimal::from(*cost),
                })
                .collect(),
        }
    }

    #[test]
    fn test_summary_aggregates_items() {
        let items = vec![
            item("Cambio de cadena", 50_000, &[("cadena", 100_000)]),
            item("  ", 10_000, &[("bujía", 5_000)]),
        ];
        let summary = WorkSummary::from_items(&items).unwrap();

        assert_eq!(summary.work_description, "Cambio de cadena");
        assert_eq!(summary.labor_cost, Decimal::from(60_000));
        assert_eq!(summary.spare_parts_cost, Decimal::from(105_000));
        assert_eq!(summary.total_cost, Decimal::from(165_000));
        assert_eq!(summary.spare_parts.len(), 2);
    }

    #[test]
    fn test_summary_requires_a_description() {
        let items = vec![item("", 50_000, &[])];
        assert!(matches!(
            WorkSummary::from_items(&items),
            Err(AppError::Validation(_))
        ));
        assert!(WorkSummary::from_items(&[]).is_err());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        assert!(RepairStatus::Completed.next_states().is_empty());
        assert!(RepairStatus::Cancelled.next_states().is_empty());
        assert!(!RepairStatus::Pending.can_become(RepairStatus::Completed));
    }

    #[test]
    fn test_cost_is_provisional_until_details() {
        let mut repair = Repair::open(Uuid::new_v4(), Some(Uuid::new_v4()), None, "Ruido".into(), vec![]);
        assert!(!repair.status.has_authoritative_cost());
        assert_eq!(repair.total_cost, Decimal::ZERO);

        repair.start_work().unwrap();
        let summary = WorkSummary::from_items(&[item("Freno", 20_000, &[("pastillas", 30_000)])]).unwrap();
        repair.record_details(&summary, vec![], vec![], Uuid::new_v4()).unwrap();

        assert!(repair.status.has_authoritative_cost());
        assert_eq!(repair.total_cost, Decimal::from(50_000));
    }

    #[test]
    fn test_complete_twice_is_invalid() {
        let mut repair = Repair::open(Uuid::new_v4(), None, None, "x".into(), vec![]);
        repair.status = RepairStatus::DetailsApproved;
        repair.complete().unwrap();
        assert!(matches!(repair.complete(), Err(AppError::InvalidTransition(_))));
        assert!(matches!(repair.cancel(), Err(AppError::InvalidTransition(_))));
    }
}
