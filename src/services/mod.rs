//! Services module
//!
//! Este módulo contiene la lógica de negocio del motor de workflow. Cada
//! servicio carga las entidades, aplica las guardas del modelo, junta las
//! escrituras en un `Changeset` y lo confirma de forma atómica.

pub mod approval_service;
pub mod authorization_service;
pub mod billing_service;
pub mod executors;
pub mod inspection_service;
pub mod motorcycle_register;
pub mod notification_service;
pub mod pricing_service;
pub mod repair_service;
pub mod workflow_context;

pub use approval_service::ApprovalService;
pub use authorization_service::AuthorizationService;
pub use billing_service::BillingService;
pub use executors::{ExecutorRegistry, ProposalExecutor};
pub use inspection_service::{GidioniOutcome, InspectionService};
pub use motorcycle_register::{InvariantReport, InvariantViolation, MotorcycleRegister, ReleaseOutcome};
pub use notification_service::{ChannelNotifier, LogNotifier, Notifier, WebhookNotifier};
pub use pricing_service::{PriceInput, PricingService};
pub use repair_service::RepairService;
pub use workflow_context::WorkflowContext;
