use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres};
use uuid::Uuid;

use crate::domain::{
    models::{Message, MessageStatus},
    repositories::MessageRepository,
};

pub type PgPool = Pool<Postgres>;

#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn create(&self, recipient: String, content: String) -> anyhow::Result<Message> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, recipient, content, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, recipient, content, status, created_at, updated_at, deleted_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&recipient)
        .bind(&content)
        .bind(MessageStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    async fn update_status(&self, id: Uuid, status: MessageStatus) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE messages
            SET status = $2, updated_at = $3
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE messages
            SET deleted_at = $2, updated_at = $2
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_all(&self, statuses: &[MessageStatus]) -> anyhow::Result<Vec<Message>> {
        let rows = if statuses.is_empty() {
            sqlx::query_as::<_, MessageRecord>(
                r#"
                SELECT id, recipient, content, status, created_at, updated_at, deleted_at
                FROM messages
                WHERE deleted_at IS NULL
                "#,
            )
            .fetch_all(&self.pool)
            .await?
        } else {
            let filter: Vec<String> = statuses.iter().map(|s| s.as_str().to_owned()).collect();
            sqlx::query_as::<_, MessageRecord>(
                r#"
                SELECT id, recipient, content, status, created_at, updated_at, deleted_at
                FROM messages
                WHERE status = ANY($1) AND deleted_at IS NULL
                "#,
            )
            .bind(&filter)
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(Message::try_from).collect()
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    recipient: String,
    content: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = anyhow::Error;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        let status = MessageStatus::from_str(&record.status)
            .ok_or_else(|| anyhow::anyhow!("unknown message status '{}'", record.status))?;
        Ok(Message {
            id: record.id,
            recipient: record.recipient,
            content: record.content,
            status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted_at: record.deleted_at,
        })
    }
}
