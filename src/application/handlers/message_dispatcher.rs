use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    application::services::delivery::DeliveryDriver,
    domain::{models::MessageStatus, repositories::MessageRepository},
};

/// Runs one dispatch pass: fetch every message still awaiting delivery and
/// attempt each one in turn. Pending and Failed messages are both eligible,
/// so failures are retried on every pass with no attempt cap.
pub struct MessageDispatcher {
    repository: Arc<dyn MessageRepository>,
    driver: Arc<dyn DeliveryDriver>,
}

impl MessageDispatcher {
    pub fn new(repository: Arc<dyn MessageRepository>, driver: Arc<dyn DeliveryDriver>) -> Self {
        Self { repository, driver }
    }

    /// A single failure never aborts the batch: a message that cannot be
    /// delivered is marked Failed and the pass moves on. A failed status
    /// write after a successful send is only logged; the message stays
    /// Pending and may be delivered again on the next pass.
    pub async fn run_pass(&self) -> anyhow::Result<()> {
        let messages = self
            .repository
            .get_all(&[MessageStatus::Pending, MessageStatus::Failed])
            .await
            .context("failed to fetch undelivered messages")?;

        info!(count = messages.len(), "fetched undelivered messages");

        for message in messages {
            match self.driver.send(&message.recipient, &message.content).await {
                Ok(receipt) => {
                    info!(
                        id = %message.id,
                        recipient = %message.recipient,
                        provider_message_id = %receipt.message_id,
                        "message sent"
                    );
                    self.mark(message.id, MessageStatus::Sent).await;
                }
                Err(err) => {
                    error!(
                        id = %message.id,
                        recipient = %message.recipient,
                        error = %err,
                        "failed to send message"
                    );
                    self.mark(message.id, MessageStatus::Failed).await;
                }
            }
        }

        Ok(())
    }

    async fn mark(&self, id: Uuid, status: MessageStatus) {
        if let Err(err) = self.repository.update_status(id, status).await {
            error!(id = %id, status = status.as_str(), error = %err, "failed to update message status");
        }
    }
}
