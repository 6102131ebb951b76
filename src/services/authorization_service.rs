//! Servicio de autorización
//!
//! Reglas de qué rol es dueño de cada transición. El motor nunca autentica:
//! recibe el `Actor` ya identificado y solo decide si puede actuar.

use crate::models::{Actor, Repair, Role};
use crate::utils::errors::{AppError, AppResult};

/// Servicio de autorización para verificar roles
pub struct AuthorizationService;

impl AuthorizationService {
    /// Verifica si un actor tiene un rol específico
    pub fn has_role(actor: &Actor, required_role: Role) -> bool {
        actor.role == required_role
    }

    /// Verifica si un actor tiene al menos uno de los roles requeridos
    pub fn has_any_role(actor: &Actor, required_roles: &[Role]) -> bool {
        required_roles.contains(&actor.role)
    }

    /// Convierte una decisión en `Unauthorized`
    pub fn require(allowed: bool, actor: &Actor, action: &str) -> AppResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "role '{}' cannot {}",
                actor.role, action
            )))
        }
    }

    pub fn can_register_motorcycle(actor: &Actor) -> bool {
        Self::has_any_role(
            actor,
            &[Role::Admin, Role::Staff, Role::Secretary, Role::Registration],
        )
    }

    /// Asignación directa; los demás roles pasan por `repair_creation`
    pub fn can_assign_repair(actor: &Actor) -> bool {
        Self::has_role(actor, Role::Admin)
    }

    /// Mecánico asignado o admin
    pub fn can_work_on_repair(actor: &Actor, repair: &Repair) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Mechanic => repair.is_assigned_to(actor.id),
            _ => false,
        }
    }

    pub fn can_cancel_repair(actor: &Actor) -> bool {
        Self::has_role(actor, Role::Admin)
    }

    /// Fase RAMA: datos del vendedor
    pub fn can_run_rama(actor: &Actor) -> bool {
        Self::has_role(actor, Role::Registration)
    }

    /// Fase GIDIONI: checklists de transporte
    pub fn can_run_gidioni(actor: &Actor) -> bool {
        Self::has_role(actor, Role::Transport)
    }

    pub fn can_handle_payments(actor: &Actor) -> bool {
        Self::has_role(actor, Role::Cashier)
    }

    pub fn can_set_sale_price(actor: &Actor) -> bool {
        Self::has_role(actor, Role::Admin)
    }
}
