//! Room handlers

use axum::{
    extract::{Path, State},
    Json,
};
use relay_service::{OpenRoomRequest, RoomResponse, RoomService};

use crate::extractors::{MemberIdentity, RoomIdPath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::server::GatewayState;

/// Open (or reuse) the room for a member set; the caller is always included
///
/// POST /api/v1/rooms
pub async fn open_room(
    State(state): State<GatewayState>,
    identity: MemberIdentity,
    ValidatedJson(request): ValidatedJson<OpenRoomRequest>,
) -> ApiResult<Created<Json<RoomResponse>>> {
    let service = RoomService::new(state.service_context());
    let response = service.open_room(identity.member_id, request).await?;
    Ok(Created(Json(response)))
}

/// GET /api/v1/rooms/{room_id}
pub async fn get_room(
    State(state): State<GatewayState>,
    identity: MemberIdentity,
    Path(path): Path<RoomIdPath>,
) -> ApiResult<Json<RoomResponse>> {
    let room_id = path.room_id()?;

    let service = RoomService::new(state.service_context());
    let response = service.get_room(room_id, identity.member_id).await?;
    Ok(Json(response))
}
