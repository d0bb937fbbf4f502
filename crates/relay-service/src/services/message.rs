//! Message service
//!
//! The outbound half of the relay: validate, persist with status `PENDING`,
//! then publish `MESSAGE_CREATE` on the room channel. Also serves history
//! queries.

use chrono::Utc;
use relay_core::traits::MessageQuery;
use relay_core::{ChatMessage, DomainError, MessageContent, RoomEvent, Snowflake};
use tracing::{debug, info, instrument, warn};

use crate::dto::{
    ListMessagesQuery, MessageResponse, PaginatedResponse, SendImageRequest, SendTextRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::room::RoomService;

/// Message service
pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    /// Create a new MessageService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Persist a message and publish it to every process serving the room.
    ///
    /// Nothing is stored or published when validation or the membership
    /// check fails. A storage failure aborts before publishing. A publish
    /// failure is logged and the persisted message is still returned; clients
    /// catch up through history.
    #[instrument(skip(self, content))]
    pub async fn send(
        &self,
        room_id: Snowflake,
        sender_id: Snowflake,
        content: MessageContent,
    ) -> ServiceResult<ChatMessage> {
        content.validate()?;

        let room = RoomService::new(self.ctx)
            .require_member(room_id, sender_id)
            .await?;

        let message = ChatMessage::new(
            self.ctx.generate_id(),
            &room,
            sender_id,
            content,
            Utc::now(),
        )?;

        self.ctx.message_store().create(&message).await?;

        info!(
            message_id = %message.id,
            room_id = %room_id,
            message_type = %message.message_type(),
            unread_count = message.unread_count,
            "Message persisted"
        );

        self.publish_message_create(&message).await;

        Ok(message)
    }

    /// Send a text message
    #[instrument(skip(self, request))]
    pub async fn send_text(
        &self,
        room_id: Snowflake,
        sender_id: Snowflake,
        request: SendTextRequest,
    ) -> ServiceResult<MessageResponse> {
        let message = self
            .send(room_id, sender_id, MessageContent::Text(request.content))
            .await?;
        Ok(MessageResponse::from(message))
    }

    /// Send an image message that references an already uploaded object
    #[instrument(skip(self, request))]
    pub async fn send_image(
        &self,
        room_id: Snowflake,
        sender_id: Snowflake,
        request: SendImageRequest,
    ) -> ServiceResult<MessageResponse> {
        let content = MessageContent::Image {
            image_url: request.image_url,
        };
        let message = self.send(room_id, sender_id, content).await?;
        Ok(MessageResponse::from(message))
    }

    /// Get a message from a room the viewer belongs to
    #[instrument(skip(self))]
    pub async fn get_message(
        &self,
        message_id: Snowflake,
        viewer_id: Snowflake,
    ) -> ServiceResult<MessageResponse> {
        let message = self
            .ctx
            .message_store()
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound(message_id))?;

        RoomService::new(self.ctx)
            .require_member(message.room_id, viewer_id)
            .await?;

        Ok(MessageResponse::from(message))
    }

    /// Page through a room's history
    #[instrument(skip(self, query))]
    pub async fn list_messages(
        &self,
        room_id: Snowflake,
        viewer_id: Snowflake,
        query: ListMessagesQuery,
    ) -> ServiceResult<PaginatedResponse<MessageResponse>> {
        if query.before.is_some() && query.after.is_some() {
            return Err(ServiceError::validation(
                "before and after cannot be combined",
            ));
        }

        RoomService::new(self.ctx)
            .require_member(room_id, viewer_id)
            .await?;

        let query = MessageQuery::from(query);
        let messages = self
            .ctx
            .message_store()
            .find_by_room(room_id, query)
            .await?;

        let has_more = messages.len() as i64 == query.limit;
        let (before, after) = match (messages.first(), messages.last()) {
            // Newest-first unless paging forward
            (Some(first), Some(last)) if query.after.is_some() => {
                (Some(first.id.to_string()), Some(last.id.to_string()))
            }
            (Some(first), Some(last)) => (Some(last.id.to_string()), Some(first.id.to_string())),
            _ => (None, None),
        };

        debug!(room_id = %room_id, count = messages.len(), "Listed messages");

        Ok(PaginatedResponse::new(
            messages.iter().map(MessageResponse::from).collect(),
            before,
            after,
            has_more,
            query.limit,
        ))
    }

    /// Publish MESSAGE_CREATE; the bus being down never fails the send
    async fn publish_message_create(&self, message: &ChatMessage) {
        let event = RoomEvent::message_created(message);
        match self.ctx.publisher().publish(&event).await {
            Ok(receivers) => {
                debug!(message_id = %message.id, receivers, "MESSAGE_CREATE published");
            }
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    room_id = %message.room_id,
                    error = %e,
                    "Failed to publish MESSAGE_CREATE"
                );
            }
        }
    }
}
