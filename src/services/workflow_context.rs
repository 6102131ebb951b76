//! Contexto compartido por los servicios de workflow
//!
//! Agrupa el store y el notificador, y concentra el paso final de toda
//! transición: confirmar el changeset y recién después notificar.

use std::fmt::Display;
use std::sync::Arc;

use tracing::warn;

use super::notification_service::Notifier;
use crate::repositories::{Changeset, WorkflowStore};
use crate::utils::errors::{AppError, AppResult};

#[derive(Clone)]
pub struct WorkflowContext {
    pub store: Arc<dyn WorkflowStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl WorkflowContext {
    pub fn new(store: Arc<dyn WorkflowStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Confirma el changeset y despacha sus eventos.
    /// Un fallo del notificador nunca falla la transición.
    pub async fn commit(&self, changes: Changeset) -> AppResult<()> {
        self.store.commit(&changes).await?;

        for event in changes.events() {
            if let Err(e) = self.notifier.notify(event).await {
                warn!(
                    "📭 No se pudo notificar {} '{}' → {}: {}",
                    event.entity_kind, event.entity_id, event.status, e
                );
            }
        }
        Ok(())
    }
}

/// Rechaza la llamada si el cliente esperaba otro estado previo
pub fn ensure_expected<S>(entity: &str, current: S, expected: Option<S>) -> AppResult<()>
where
    S: PartialEq + Display,
{
    match expected {
        Some(expected) if expected != current => Err(AppError::Conflict(format!(
            "{} is '{}', caller expected '{}'",
            entity, current, expected
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RepairStatus;

    #[test]
    fn test_ensure_expected() {
        assert!(ensure_expected("repair", RepairStatus::Pending, None).is_ok());
        assert!(ensure_expected("repair", RepairStatus::Pending, Some(RepairStatus::Pending)).is_ok());
        assert!(matches!(
            ensure_expected("repair", RepairStatus::InProgress, Some(RepairStatus::Pending)),
            Err(AppError::Conflict(_))
        ));
    }
}
