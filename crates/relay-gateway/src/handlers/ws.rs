//! Room socket
//!
//! One socket per member per room. The socket is registered with the
//! connection registry for its whole lifetime so room events relayed from
//! the bus reach it; client frames are handled through the same services as
//! the HTTP endpoints.

use crate::connection::Connection;
use crate::extractors::{MemberIdentity, RoomIdPath};
use crate::protocol::{ClientFrame, ServerFrame};
use crate::response::ApiResult;
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use relay_core::Snowflake;
use relay_service::{
    MessageService, RoomService, SendImageRequest, SendTextRequest, ServiceError, UnreadTracker,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Close reason sent to a socket the registry evicted
pub const EVICTED_REASON: &str = "connection too slow";

/// GET /ws/rooms/{room_id}?member_id=
///
/// Membership is checked before the upgrade so outsiders get a plain HTTP
/// error instead of a socket.
pub async fn room_socket(
    State(state): State<GatewayState>,
    identity: MemberIdentity,
    Path(path): Path<RoomIdPath>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let room_id = path.room_id()?;

    RoomService::new(state.service_context())
        .require_member(room_id, identity.member_id)
        .await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(state, socket, room_id, identity.member_id)))
}

async fn handle_socket(state: GatewayState, socket: WebSocket, room_id: Snowflake, member_id: Snowflake) {
    let buffer = state.config().relay.connection_buffer.max(1);
    let (tx, mut rx) = mpsc::channel::<Arc<str>>(buffer);

    let connection = Connection::new(Connection::generate_session_id(), member_id, tx);
    let session_id = connection.session_id().to_string();
    state.registry().register(room_id, Arc::clone(&connection));

    info!(
        session_id = %session_id,
        room_id = %room_id,
        member_id = %member_id,
        "Room socket connected"
    );

    let (mut ws_sink, mut ws_stream) = socket.split();

    let session_id_send = session_id.clone();
    let writer = Arc::clone(&connection);
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    if ws_sink.send(Message::Text(frame.to_string())).await.is_err() {
                        debug!(session_id = %session_id_send, "Socket write failed");
                        break;
                    }
                }
                _ = writer.evicted() => {
                    warn!(session_id = %session_id_send, "Closing evicted socket");
                    let close = CloseFrame {
                        code: close_code::AGAIN,
                        reason: EVICTED_REASON.into(),
                    };
                    let _ = ws_sink.send(Message::Close(Some(close))).await;
                    break;
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    let state_recv = state.clone();
    let session_id_recv = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text_frame(&state_recv, room_id, &connection, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    reply(
                        &state_recv,
                        &connection,
                        ServerFrame::error("INVALID_FRAME", "binary frames are not supported"),
                    )
                    .await;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    trace!(session_id = %session_id_recv, "Control frame");
                }
                Ok(Message::Close(_)) => {
                    debug!(session_id = %session_id_recv, "Client closed socket");
                    break;
                }
                Err(e) => {
                    warn!(session_id = %session_id_recv, error = %e, "Socket read failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.registry().unregister_connection(&session_id);

    info!(session_id = %session_id, room_id = %room_id, "Room socket disconnected");
}

async fn handle_text_frame(state: &GatewayState, room_id: Snowflake, connection: &Connection, text: &str) {
    let frame = match ClientFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(session_id = %connection.session_id(), error = %e, "Unreadable client frame");
            reply(state, connection, ServerFrame::error("INVALID_FRAME", e.to_string())).await;
            return;
        }
    };

    let ctx = state.service_context();
    let member_id = connection.member_id();

    let result: Result<(), ServiceError> = match frame {
        ClientFrame::SendText { content } => MessageService::new(ctx)
            .send_text(room_id, member_id, SendTextRequest { content })
            .await
            .map(|_| ()),
        ClientFrame::SendImage { image_url } => MessageService::new(ctx)
            .send_image(room_id, member_id, SendImageRequest { image_url })
            .await
            .map(|_| ()),
        ClientFrame::Delivered { message_id } => UnreadTracker::new(ctx)
            .mark_delivered(message_id, member_id)
            .await
            .map(|_| ()),
        ClientFrame::Read { message_id } => UnreadTracker::new(ctx)
            .acknowledge(message_id, member_id)
            .await
            .map(|_| ()),
        ClientFrame::Ping => {
            reply(state, connection, ServerFrame::Pong).await;
            Ok(())
        }
    };

    if let Err(e) = result {
        reply(state, connection, ServerFrame::error(e.error_code(), e.to_string())).await;
    }
}

async fn reply(state: &GatewayState, connection: &Connection, frame: ServerFrame) {
    let payload = match frame.encode() {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to encode server frame");
            return;
        }
    };

    if let Err(e) = connection
        .send_timeout(payload, state.registry().write_timeout())
        .await
    {
        debug!(session_id = %connection.session_id(), error = %e, "Reply dropped");
    }
}
