//! Notificaciones de transiciones terminales
//!
//! Canal lateral "fire-and-forget": se llama después del commit y sus
//! errores solo se registran en el log.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::WorkflowEvent;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook answered with status {0}")]
    Status(u16),

    #[error("notification channel closed")]
    ChannelClosed,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotificationError>;
}

/// Notificador por defecto: solo escribe en el log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotificationError> {
        info!(
            "📣 {} '{}' → {} por {} ({}): {}",
            event.entity_kind,
            event.entity_id,
            event.status,
            event.actor_id,
            event.actor_role,
            event.summary
        );
        Ok(())
    }
}

/// POST del evento como JSON a un webhook externo
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self, NotificationError> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotificationError> {
        let response = self.client.post(&self.url).json(event).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Status(status.as_u16()));
        }
        debug!("📨 Webhook notificado: {} '{}'", event.entity_kind, event.entity_id);
        Ok(())
    }
}

/// Reenvía los eventos a un canal; útil para observarlos en tests
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<WorkflowEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotificationError> {
        self.sender
            .send(event.clone())
            .map_err(|_| NotificationError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Actor, EntityKind, Role};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_channel_notifier_forwards_events() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let actor = Actor::new(Uuid::new_v4(), Role::Admin);
        let event = WorkflowEvent::new(EntityKind::Repair, Uuid::new_v4(), "completed", &actor, "done");

        notifier.notify(&event).await.unwrap();
        assert_eq!(rx.recv().await, Some(event.clone()));

        drop(rx);
        assert!(matches!(
            notifier.notify(&event).await,
            Err(NotificationError::ChannelClosed)
        ));
    }
}
