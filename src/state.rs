//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum: la configuración y un servicio por workflow,
//! todos sobre el mismo store y notificador.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::WorkflowStore;
use crate::services::{
    ApprovalService, BillingService, ExecutorRegistry, InspectionService, MotorcycleRegister,
    Notifier, PricingService, RepairService, WorkflowContext,
};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn WorkflowStore>,
    pub motorcycles: MotorcycleRegister,
    pub approvals: ApprovalService,
    pub repairs: RepairService,
    pub inspections: InspectionService,
    pub billing: BillingService,
    pub pricing: PricingService,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        store: Arc<dyn WorkflowStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ctx = WorkflowContext::new(store.clone(), notifier);
        let executors = Arc::new(ExecutorRegistry::default());

        Self {
            approvals: ApprovalService::new(
                ctx.clone(),
                executors.clone(),
                config.approval_stale_after(),
            ),
            repairs: RepairService::new(ctx.clone(), executors),
            motorcycles: MotorcycleRegister::new(ctx.clone()),
            inspections: InspectionService::new(ctx.clone()),
            billing: BillingService::new(ctx.clone()),
            pricing: PricingService::new(ctx),
            config,
            store,
        }
    }
}
