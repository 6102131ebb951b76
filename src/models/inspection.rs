//! Modelo de Inspection
//!
//! Inspección previa al transporte en dos fases: RAMA (registro, datos del
//! vendedor) y GIDIONI (transporte, checklists mecánico/eléctrico).
//! Cada grupo de campos solo es editable por el rol dueño de su fase y queda
//! congelado una vez marcada la fase como completada.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use super::actor::Role;
use crate::utils::errors::{invalid_transition, validation_error, AppResult};

/// Estado del workflow de inspección
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "inspection_status", rename_all = "snake_case")]
pub enum InspectionStatus {
    RamaPending,
    RamaCompleted,
    GidioniPending,
    GidioniCompleted,
}

text_enum!(InspectionStatus {
    RamaPending => "rama_pending",
    RamaCompleted => "rama_completed",
    GidioniPending => "gidioni_pending",
    GidioniCompleted => "gidioni_completed",
});

impl InspectionStatus {
    pub fn next_states(&self) -> &'static [InspectionStatus] {
        use InspectionStatus::*;
        match self {
            RamaPending => &[RamaCompleted],
            RamaCompleted => &[GidioniPending, GidioniCompleted],
            GidioniPending => &[GidioniCompleted],
            GidioniCompleted => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InspectionStatus::GidioniCompleted)
    }

    fn gidioni_open(&self) -> bool {
        matches!(self, InspectionStatus::RamaCompleted | InspectionStatus::GidioniPending)
    }
}

/// Pregunta → respuesta (`None` = sin responder)
pub type Checklist = BTreeMap<String, Option<bool>>;

/// Bloque de datos del vendedor, propiedad exclusiva de la fase RAMA
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SellerInformation {
    pub full_name: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub ownership_document_verified: Option<bool>,
    pub notes: Option<String>,
}

/// Los tres bloques de checklist de la fase GIDIONI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionChecklists {
    #[serde(default)]
    pub external_appearance: Checklist,
    #[serde(default)]
    pub electrical_system: Checklist,
    #[serde(default)]
    pub engine_system: Checklist,
}

impl InspectionChecklists {
    /// Ítems respondidos `false`, como `"<bloque>.<pregunta>"`
    pub fn failed_items(&self) -> Vec<String> {
        let blocks = [
            ("external_appearance", &self.external_appearance),
            ("electrical_system", &self.electrical_system),
            ("engine_system", &self.engine_system),
        ];

        blocks
            .iter()
            .flat_map(|(block, checklist)| {
                checklist
                    .iter()
                    .filter(|(_, answer)| **answer == Some(false))
                    .map(move |(question, _)| format!("{}.{}", block, question))
            })
            .collect()
    }
}

/// Inspection principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: Uuid,
    pub motorcycle_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub workflow_status: InspectionStatus,
    pub seller_information: Option<SellerInformation>,
    #[serde(flatten)]
    pub checklists: InspectionChecklists,
    pub created_by: Uuid,
    pub rama_verified_by: Option<Uuid>,
    pub rama_verified_at: Option<DateTime<Utc>>,
    pub gidioni_verified_by: Option<Uuid>,
    pub gidioni_verified_at: Option<DateTime<Utc>>,
    pub spawned_repair_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inspection {
    pub fn create(
        motorcycle_id: Uuid,
        contract_id: Option<Uuid>,
        customer_id: Option<Uuid>,
        created_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            motorcycle_id,
            contract_id,
            customer_id,
            workflow_status: InspectionStatus::RamaPending,
            seller_information: None,
            checklists: InspectionChecklists::default(),
            created_by,
            rama_verified_by: None,
            rama_verified_at: None,
            gidioni_verified_by: None,
            gidioni_verified_at: None,
            spawned_repair_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Estado visto por cada rol: para transporte, rama_completed ya es gidioni_pending
    pub fn effective_status(&self, role: Role) -> InspectionStatus {
        match (role, self.workflow_status) {
            (Role::Transport, InspectionStatus::RamaCompleted) => InspectionStatus::GidioniPending,
            (_, status) => status,
        }
    }

    pub fn save_seller_info(&mut self, seller: SellerInformation) -> AppResult<()> {
        if self.workflow_status != InspectionStatus::RamaPending {
            return Err(invalid_transition(
                "inspection",
                self.workflow_status.as_str(),
                "edit seller information",
            ));
        }
        self.seller_information = Some(seller);
        Ok(())
    }

    pub fn verify_rama(
        &mut self,
        seller: Option<SellerInformation>,
        verified_by: Uuid,
    ) -> AppResult<InspectionStatus> {
        if self.workflow_status != InspectionStatus::RamaPending {
            return Err(invalid_transition(
                "inspection",
                self.workflow_status.as_str(),
                "verify RAMA",
            ));
        }

        let seller = match seller.or_else(|| self.seller_information.clone()) {
            Some(seller) if !seller.full_name.trim().is_empty() => seller,
            _ => {
                return Err(validation_error(
                    "seller_information.full_name",
                    "seller name is required to verify RAMA",
                ))
            }
        };

        let previous = self.workflow_status;
        self.seller_information = Some(seller);
        self.workflow_status = InspectionStatus::RamaCompleted;
        self.rama_verified_by = Some(verified_by);
        self.rama_verified_at = Some(Utc::now());
        Ok(previous)
    }

    /// Guarda un borrador de checklists; marca la fase GIDIONI como iniciada
    pub fn save_checklists(&mut self, checklists: InspectionChecklists) -> AppResult<InspectionStatus> {
        if !self.workflow_status.gidioni_open() {
            return Err(invalid_transition(
                "inspection",
                self.workflow_status.as_str(),
                "edit checklists",
            ));
        }
        let previous = self.workflow_status;
        self.checklists = checklists;
        self.workflow_status = InspectionStatus::GidioniPending;
        Ok(previous)
    }

    pub fn verify_gidioni(
        &mut self,
        checklists: Option<InspectionChecklists>,
        verified_by: Uuid,
    ) -> AppResult<InspectionStatus> {
        if !self.workflow_status.gidioni_open() {
            return Err(invalid_transition(
                "inspection",
                self.workflow_status.as_str(),
                "verify GIDIONI",
            ));
        }

        let previous = self.workflow_status;
        if let Some(checklists) = checklists {
            self.checklists = checklists;
        }
        self.workflow_status = InspectionStatus::GidioniCompleted;
        self.gidioni_verified_by = Some(verified_by);
        self.gidioni_verified_at = Some(Utc::now());
        Ok(previous)
    }
}
