use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::{Message, MessageStatus};

/// Persistence contract for messages. Producers create rows, the dispatch
/// pass is the only writer of status transitions, deletion is administrative.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, recipient: String, content: String) -> anyhow::Result<Message>;

    async fn update_status(&self, id: Uuid, status: MessageStatus) -> anyhow::Result<()>;

    /// Soft delete: the row stays in place but disappears from every query.
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;

    /// Messages matching any of the given statuses; an empty filter returns
    /// everything. No ordering is guaranteed.
    async fn get_all(&self, statuses: &[MessageStatus]) -> anyhow::Result<Vec<Message>>;
}
