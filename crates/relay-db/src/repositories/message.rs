//! PostgreSQL implementation of MessageStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use relay_core::entities::{AckOutcome, ChatMessage};
use relay_core::traits::{MessageQuery, MessageStore, RepoResult};
use relay_core::value_objects::Snowflake;

use crate::mappers::MessageInsert;
use crate::models::ChatMessageModel;

use super::error::{map_db_error, message_not_found};

const MESSAGE_SELECT: &str = r"
    SELECT m.id,
           m.room_id,
           m.sender_id,
           m.message_type,
           m.content,
           m.image_url,
           m.unread_count,
           m.status,
           ARRAY(
               SELECT a.member_id FROM chat_message_acks a
               WHERE a.message_id = m.id
               ORDER BY a.member_id
           ) AS acknowledged_by,
           m.created_at,
           m.updated_at
    FROM chat_messages m
";

/// Which state change a locked read-modify-write applies
#[derive(Debug, Clone, Copy)]
enum Transition {
    Acknowledge,
    Deliver,
}

/// PostgreSQL implementation of MessageStore
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the row, let the entity decide, persist what changed
    async fn apply(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
        now: DateTime<Utc>,
        transition: Transition,
    ) -> RepoResult<AckOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let sql = format!("{MESSAGE_SELECT} WHERE m.id = $1 FOR UPDATE OF m");
        let model = sqlx::query_as::<_, ChatMessageModel>(&sql)
            .bind(message_id.into_inner())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| message_not_found(message_id))?;

        let mut message = ChatMessage::try_from(model)?;
        let outcome = match transition {
            Transition::Acknowledge => message.acknowledge(recipient_id, now),
            Transition::Deliver => message.mark_delivered(recipient_id, now),
        };

        if !outcome.changed {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(outcome);
        }

        if let Transition::Acknowledge = transition {
            sqlx::query(
                r"
                INSERT INTO chat_message_acks (message_id, member_id, acknowledged_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (message_id, member_id) DO NOTHING
                ",
            )
            .bind(message_id.into_inner())
            .bind(recipient_id.into_inner())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        sqlx::query(
            r"
            UPDATE chat_messages
            SET unread_count = $2, status = $3, updated_at = $4
            WHERE id = $1
            ",
        )
        .bind(message_id.into_inner())
        .bind(i32::try_from(outcome.unread_count).unwrap_or(i32::MAX))
        .bind(outcome.status.as_str())
        .bind(outcome.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(outcome)
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    #[instrument(skip(self, message), fields(message_id = %message.id, room_id = %message.room_id))]
    async fn create(&self, message: &ChatMessage) -> RepoResult<()> {
        let row = MessageInsert::new(message);

        sqlx::query(
            r"
            INSERT INTO chat_messages
                (id, room_id, sender_id, message_type, content, image_url,
                 unread_count, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(row.id)
        .bind(row.room_id)
        .bind(row.sender_id)
        .bind(row.message_type)
        .bind(row.content)
        .bind(row.image_url)
        .bind(row.unread_count)
        .bind(row.status)
        .bind(message.timestamps.created_at)
        .bind(message.timestamps.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ChatMessage>> {
        let sql = format!("{MESSAGE_SELECT} WHERE m.id = $1");
        let result = sqlx::query_as::<_, ChatMessageModel>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        result.map(ChatMessage::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_room(
        &self,
        room_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<ChatMessage>> {
        let limit = query.limit.clamp(1, MessageQuery::MAX_LIMIT);

        let results = match (query.before, query.after) {
            (Some(before), _) => {
                // Older than the cursor (scrolling up)
                let sql = format!(
                    "{MESSAGE_SELECT} WHERE m.room_id = $1 AND m.id < $2 ORDER BY m.id DESC LIMIT $3"
                );
                sqlx::query_as::<_, ChatMessageModel>(&sql)
                    .bind(room_id.into_inner())
                    .bind(before.into_inner())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
            }
            (None, Some(after)) => {
                // Newer than the cursor (catching up)
                let sql = format!(
                    "{MESSAGE_SELECT} WHERE m.room_id = $1 AND m.id > $2 ORDER BY m.id ASC LIMIT $3"
                );
                sqlx::query_as::<_, ChatMessageModel>(&sql)
                    .bind(room_id.into_inner())
                    .bind(after.into_inner())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
            }
            (None, None) => {
                let sql =
                    format!("{MESSAGE_SELECT} WHERE m.room_id = $1 ORDER BY m.id DESC LIMIT $2");
                sqlx::query_as::<_, ChatMessageModel>(&sql)
                    .bind(room_id.into_inner())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(map_db_error)?;

        results.into_iter().map(ChatMessage::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn acknowledge(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
        now: DateTime<Utc>,
    ) -> RepoResult<AckOutcome> {
        self.apply(message_id, recipient_id, now, Transition::Acknowledge)
            .await
    }

    #[instrument(skip(self))]
    async fn mark_delivered(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
        now: DateTime<Utc>,
    ) -> RepoResult<AckOutcome> {
        self.apply(message_id, recipient_id, now, Transition::Deliver)
            .await
    }
}
