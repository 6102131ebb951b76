use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{ApprovalPriority, ApprovalRequest, Repair, RepairStatus, WorkItem};
use crate::utils::validation::not_blank;

// Request para asignar una reparación
#[derive(Debug, Deserialize, Validate)]
pub struct AssignRepairRequest {
    pub motorcycle_id: Uuid,
    pub mechanic_id: Option<Uuid>,
    #[validate(custom = "not_blank")]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignMechanicRequest {
    pub mechanic_id: Uuid,
    pub expected_status: Option<RepairStatus>,
}

// Detalles del trabajo realizado
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDetailsRequest {
    #[validate(length(min = 1))]
    pub work_items: Vec<WorkItem>,
    #[serde(default)]
    pub issues_found: Vec<String>,
    #[serde(default)]
    pub proof_of_work: Vec<String>,
    pub expected_status: Option<RepairStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CostEditRequest {
    #[validate(length(min = 1))]
    pub work_items: Vec<WorkItem>,
    #[serde(default)]
    pub priority: ApprovalPriority,
}

#[derive(Debug, Serialize)]
pub struct DetailsRegisteredResponse {
    pub repair: Repair,
    pub approval_request: ApprovalRequest,
}
