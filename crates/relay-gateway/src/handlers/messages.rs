//! Message handlers
//!
//! Sending, history and acknowledgements over plain HTTP. Room sockets offer
//! the same operations as frames.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use relay_service::{
    AckResponse, ListMessagesQuery, MessageResponse, MessageService, PaginatedResponse,
    SendImageRequest, SendTextRequest, UnreadTracker,
};

use crate::extractors::{MemberIdentity, MessageIdPath, RoomIdPath, ValidatedJson};
use crate::response::{ApiError, ApiResult, Created};
use crate::server::GatewayState;

/// Page through a room's history, newest first
///
/// GET /api/v1/rooms/{room_id}/messages
pub async fn list_messages(
    State(state): State<GatewayState>,
    identity: MemberIdentity,
    Path(path): Path<RoomIdPath>,
    query: Result<Query<ListMessagesQuery>, axum::extract::rejection::QueryRejection>,
) -> ApiResult<Json<PaginatedResponse<MessageResponse>>> {
    let room_id = path.room_id()?;
    let Query(query) = query.map_err(|e| ApiError::invalid_query(e.body_text()))?;

    let service = MessageService::new(state.service_context());
    let page = service
        .list_messages(room_id, identity.member_id, query)
        .await?;
    Ok(Json(page))
}

/// POST /api/v1/rooms/{room_id}/messages
pub async fn send_text(
    State(state): State<GatewayState>,
    identity: MemberIdentity,
    Path(path): Path<RoomIdPath>,
    ValidatedJson(request): ValidatedJson<SendTextRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let room_id = path.room_id()?;

    let service = MessageService::new(state.service_context());
    let response = service
        .send_text(room_id, identity.member_id, request)
        .await?;
    Ok(Created(Json(response)))
}

/// Send a message referencing an image already in object storage
///
/// POST /api/v1/rooms/{room_id}/images
pub async fn send_image(
    State(state): State<GatewayState>,
    identity: MemberIdentity,
    Path(path): Path<RoomIdPath>,
    ValidatedJson(request): ValidatedJson<SendImageRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let room_id = path.room_id()?;

    let service = MessageService::new(state.service_context());
    let response = service
        .send_image(room_id, identity.member_id, request)
        .await?;
    Ok(Created(Json(response)))
}

/// GET /api/v1/messages/{message_id}
pub async fn get_message(
    State(state): State<GatewayState>,
    identity: MemberIdentity,
    Path(path): Path<MessageIdPath>,
) -> ApiResult<Json<MessageResponse>> {
    let message_id = path.message_id()?;

    let service = MessageService::new(state.service_context());
    let response = service.get_message(message_id, identity.member_id).await?;
    Ok(Json(response))
}

/// Mark a message as read by the caller
///
/// POST /api/v1/messages/{message_id}/ack
pub async fn acknowledge(
    State(state): State<GatewayState>,
    identity: MemberIdentity,
    Path(path): Path<MessageIdPath>,
) -> ApiResult<Json<AckResponse>> {
    let message_id = path.message_id()?;

    let tracker = UnreadTracker::new(state.service_context());
    let outcome = tracker.acknowledge(message_id, identity.member_id).await?;
    Ok(Json(AckResponse::from(outcome)))
}
