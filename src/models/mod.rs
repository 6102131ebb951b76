//! Modelos del sistema
//!
//! Entidades del workflow (moto, inspección, reparación, factura, solicitud
//! de aprobación, contrato) con sus enums de estado y las guardas puras de
//! cada transición. Ninguna función de este módulo toca la persistencia.

/// Nombre estable de cada variante: genera `as_str` y `Display`.
/// El mapeo a PostgreSQL lo deriva `sqlx::Type` en cada enum.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod actor;
pub mod approval;
pub mod contract;
pub mod history;
pub mod inspection;
pub mod motorcycle;
pub mod repair;
pub mod repair_bill;

pub use actor::{Actor, Role};
pub use approval::{ApprovalKind, ApprovalPriority, ApprovalRequest, ApprovalStatus};
pub use contract::{Contract, ContractStatus, ContractType};
pub use history::{EntityKind, StatusHistoryEntry, WorkflowEvent};
pub use inspection::{Checklist, Inspection, InspectionChecklists, InspectionStatus, SellerInformation};
pub use motorcycle::{HoldKind, Holder, Motorcycle, MotorcycleDetails, MotorcycleStatus, PricingStatus};
pub use repair::{Repair, RepairStatus, SparePart, WorkItem, WorkSummary};
pub use repair_bill::{BillStatus, RepairBill};
