//! PostgreSQL implementation of RoomRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use relay_core::entities::ChatRoom;
use relay_core::traits::{RepoResult, RoomRepository};
use relay_core::value_objects::Snowflake;

use crate::mappers::member_key;
use crate::models::ChatRoomModel;

use super::error::map_db_error;

const ROOM_SELECT: &str = r"
    SELECT r.id,
           r.member_key,
           ARRAY(
               SELECT m.member_id FROM chat_room_members m
               WHERE m.room_id = r.id
               ORDER BY m.member_id
           ) AS member_ids,
           r.created_at,
           r.updated_at
    FROM chat_rooms r
";

/// PostgreSQL implementation of RoomRepository
#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ChatRoom>> {
        let sql = format!("{ROOM_SELECT} WHERE r.id = $1");
        let result = sqlx::query_as::<_, ChatRoomModel>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(ChatRoom::from))
    }

    #[instrument(skip(self))]
    async fn find_by_members(&self, member_ids: &[Snowflake]) -> RepoResult<Option<ChatRoom>> {
        let sql = format!("{ROOM_SELECT} WHERE r.member_key = $1");
        let result = sqlx::query_as::<_, ChatRoomModel>(&sql)
            .bind(member_key(member_ids))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(ChatRoom::from))
    }

    /// Inserting a member set that already has a room is a silent no-op;
    /// callers re-read through `find_by_members`.
    #[instrument(skip(self), fields(room_id = %room.id))]
    async fn create(&self, room: &ChatRoom) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let inserted = sqlx::query(
            r"
            INSERT INTO chat_rooms (id, member_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (member_key) DO NOTHING
            ",
        )
        .bind(room.id.into_inner())
        .bind(member_key(&room.member_ids))
        .bind(room.timestamps.created_at)
        .bind(room.timestamps.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if inserted.rows_affected() == 0 {
            tracing::debug!("Room for this member set already exists");
            tx.commit().await.map_err(map_db_error)?;
            return Ok(());
        }

        let members: Vec<i64> = room.member_ids.iter().map(|id| id.into_inner()).collect();
        sqlx::query(
            r"
            INSERT INTO chat_room_members (room_id, member_id, joined_at)
            SELECT $1, UNNEST($2::BIGINT[]), $3
            ",
        )
        .bind(room.id.into_inner())
        .bind(&members)
        .bind(room.timestamps.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_member(&self, room_id: Snowflake, member_id: Snowflake) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM chat_room_members
                WHERE room_id = $1 AND member_id = $2
            )
            ",
        )
        .bind(room_id.into_inner())
        .bind(member_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgRoomRepository>();
    }
}
