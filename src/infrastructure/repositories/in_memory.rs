use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    models::{Message, MessageStatus},
    repositories::MessageRepository,
};

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: Arc<RwLock<HashMap<Uuid, Message>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, recipient: String, content: String) -> anyhow::Result<Message> {
        let now = Utc::now();
        let entry = Message {
            id: Uuid::new_v4(),
            recipient,
            content,
            status: MessageStatus::Pending,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let mut messages = self.messages.write().await;
        messages.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn update_status(&self, id: Uuid, status: MessageStatus) -> anyhow::Result<()> {
        let mut messages = self.messages.write().await;
        if let Some(entry) = messages.get_mut(&id)
            && entry.deleted_at.is_none()
        {
            entry.status = status;
            entry.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut messages = self.messages.write().await;
        if let Some(entry) = messages.get_mut(&id)
            && entry.deleted_at.is_none()
        {
            let now = Utc::now();
            entry.deleted_at = Some(now);
            entry.updated_at = now;
        }
        Ok(())
    }

    async fn get_all(&self, statuses: &[MessageStatus]) -> anyhow::Result<Vec<Message>> {
        let messages = self.messages.read().await;
        Ok(messages
            .values()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| statuses.is_empty() || statuses.contains(&m.status))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_yields_a_pending_message() {
        let repository = InMemoryMessageRepository::new();
        let message = repository
            .create("+123".to_owned(), "hi".to_owned())
            .await
            .unwrap();

        assert_eq!(message.status, MessageStatus::Pending);
        assert!(message.deleted_at.is_none());
    }

    #[tokio::test]
    async fn status_filter_matches_only_requested_statuses() {
        let repository = InMemoryMessageRepository::new();
        let sent = repository
            .create("+1".to_owned(), "a".to_owned())
            .await
            .unwrap();
        let failed = repository
            .create("+2".to_owned(), "b".to_owned())
            .await
            .unwrap();
        repository
            .create("+3".to_owned(), "c".to_owned())
            .await
            .unwrap();

        repository
            .update_status(sent.id, MessageStatus::Sent)
            .await
            .unwrap();
        repository
            .update_status(failed.id, MessageStatus::Failed)
            .await
            .unwrap();

        let undelivered = repository
            .get_all(&[MessageStatus::Pending, MessageStatus::Failed])
            .await
            .unwrap();
        assert_eq!(undelivered.len(), 2);
        assert!(undelivered.iter().all(|m| m.status != MessageStatus::Sent));

        let everything = repository.get_all(&[]).await.unwrap();
        assert_eq!(everything.len(), 3);
    }

    #[tokio::test]
    async fn soft_deleted_messages_disappear_from_queries() {
        let repository = InMemoryMessageRepository::new();
        let message = repository
            .create("+123".to_owned(), "hi".to_owned())
            .await
            .unwrap();

        repository.delete(message.id).await.unwrap();

        assert!(repository.get_all(&[]).await.unwrap().is_empty());
        assert!(
            repository
                .get_all(&[MessageStatus::Pending])
                .await
                .unwrap()
                .is_empty()
        );
    }
}
