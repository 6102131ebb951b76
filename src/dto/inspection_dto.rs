use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    Inspection, InspectionChecklists, InspectionStatus, Repair, Role, SellerInformation,
};
use crate::services::GidioniOutcome;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInspectionRequest {
    pub motorcycle_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveSellerInfoRequest {
    pub seller_information: SellerInformation,
    pub expected_status: Option<InspectionStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct VerifyRamaRequest {
    pub seller_information: Option<SellerInformation>,
    pub expected_status: Option<InspectionStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveChecklistsRequest {
    #[serde(flatten)]
    pub checklists: InspectionChecklists,
    pub expected_status: Option<InspectionStatus>,
}

fn spawn_repair_default() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyGidioniRequest {
    pub checklists: Option<InspectionChecklists>,
    #[serde(default = "spawn_repair_default")]
    pub spawn_repair: bool,
    pub mechanic_id: Option<Uuid>,
    pub expected_status: Option<InspectionStatus>,
}

impl Default for VerifyGidioniRequest {
    fn default() -> Self {
        Self {
            checklists: None,
            spawn_repair: true,
            mechanic_id: None,
            expected_status: None,
        }
    }
}

// Inspección con el estado tal como lo ve el rol que consulta
#[derive(Debug, Serialize)]
pub struct InspectionResponse {
    #[serde(flatten)]
    pub inspection: Inspection,
    pub effective_status: InspectionStatus,
}

impl InspectionResponse {
    pub fn for_role(inspection: Inspection, role: Option<Role>) -> Self {
        let effective_status = match role {
            Some(role) => inspection.effective_status(role),
            None => inspection.workflow_status,
        };
        Self {
            inspection,
            effective_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GidioniResponse {
    pub inspection: Inspection,
    pub spawned_repair: Option<Repair>,
}

impl From<GidioniOutcome> for GidioniResponse {
    fn from(outcome: GidioniOutcome) -> Self {
        Self {
            inspection: outcome.inspection,
            spawned_repair: outcome.spawned_repair,
        }
    }
}
