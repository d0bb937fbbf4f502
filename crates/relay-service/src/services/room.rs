//! Room service
//!
//! Opens rooms for a member set and answers membership questions for the
//! other services and the WebSocket upgrade.

use chrono::Utc;
use relay_core::{ChatRoom, DomainError, Snowflake};
use tracing::{debug, info, instrument};

use crate::dto::{OpenRoomRequest, RoomResponse};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Room service
pub struct RoomService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RoomService<'a> {
    /// Create a new RoomService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a room for `creator` and the requested members.
    ///
    /// Idempotent: opening the same member set again returns the existing
    /// room, also when two callers race to create it.
    #[instrument(skip(self, request))]
    pub async fn open_room(
        &self,
        creator_id: Snowflake,
        request: OpenRoomRequest,
    ) -> ServiceResult<RoomResponse> {
        let members = ChatRoom::normalize_members(
            request
                .member_ids
                .into_iter()
                .chain(std::iter::once(creator_id)),
        );

        if let Some(room) = self.ctx.room_repo().find_by_members(&members).await? {
            debug!(room_id = %room.id, "Room already open");
            return Ok(RoomResponse::from(room));
        }

        let room = ChatRoom::new(self.ctx.generate_id(), members, Utc::now())?;
        self.ctx.room_repo().create(&room).await?;

        // A concurrent open may have won the insert; return whichever row exists
        let room = self
            .ctx
            .room_repo()
            .find_by_members(&room.member_ids)
            .await?
            .unwrap_or(room);

        info!(room_id = %room.id, members = room.member_count(), "Room opened");

        Ok(RoomResponse::from(room))
    }

    /// Get a room the viewer belongs to
    #[instrument(skip(self))]
    pub async fn get_room(
        &self,
        room_id: Snowflake,
        viewer_id: Snowflake,
    ) -> ServiceResult<RoomResponse> {
        let room = self.require_member(room_id, viewer_id).await?;
        Ok(RoomResponse::from(room))
    }

    /// Load a room, failing unless `member_id` belongs to it
    ///
    /// # Errors
    /// `RoomNotFound` for unknown rooms, `AccessDenied` for non-members
    pub async fn require_member(
        &self,
        room_id: Snowflake,
        member_id: Snowflake,
    ) -> ServiceResult<ChatRoom> {
        let room = self
            .ctx
            .room_repo()
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound(room_id))?;

        room.ensure_member(member_id)?;
        Ok(room)
    }
}
