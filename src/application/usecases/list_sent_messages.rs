use std::sync::Arc;

use tracing::info;

use crate::domain::{
    models::{Message, MessageStatus},
    repositories::MessageRepository,
};

pub struct ListSentMessagesUseCase {
    repository: Arc<dyn MessageRepository>,
}

impl ListSentMessagesUseCase {
    pub fn new(repository: Arc<dyn MessageRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self) -> anyhow::Result<Vec<Message>> {
        let messages = self.repository.get_all(&[MessageStatus::Sent]).await?;
        info!(count = messages.len(), "fetched sent messages");
        Ok(messages)
    }
}
