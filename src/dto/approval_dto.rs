use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::models::{ApprovalKind, ApprovalPriority, ApprovalStatus};
use crate::utils::validation::not_blank;

// Request para enviar una propuesta a la cadena
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitApprovalRequest {
    pub approval_type: ApprovalKind,
    pub proposed_data: Value,
    #[serde(default)]
    pub priority: ApprovalPriority,
}

// Aprobación de ventas o admin
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApprovalDecisionRequest {
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
    pub expected_status: Option<ApprovalStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectApprovalRequest {
    #[validate(custom = "not_blank", length(max = 2000))]
    pub reason: String,
    pub expected_status: Option<ApprovalStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApprovalListQuery {
    pub status: Option<ApprovalStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct StaleApprovalsQuery {
    /// Hasta diez años
    #[validate(range(min = 1, max = 87600))]
    pub hours: Option<i64>,
}
