//! Unread tracker
//!
//! Applies delivery confirmations and read acknowledgements through the
//! message store and announces every state change on the room channel as
//! `MESSAGE_STATUS_UPDATE`.

use chrono::Utc;
use relay_core::{AckOutcome, DomainError, RoomEvent, Snowflake};
use tracing::{debug, info, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Unread count and delivery status bookkeeping
pub struct UnreadTracker<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UnreadTracker<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record that `recipient_id` read the message.
    ///
    /// Each distinct recipient decrements the unread count once; the last one
    /// moves the message to `READ`. Repeated acks, acks from the sender and
    /// acks after `READ` return an outcome with `changed == false`.
    #[instrument(skip(self))]
    pub async fn acknowledge(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
    ) -> ServiceResult<AckOutcome> {
        self.ensure_recipient_in_room(message_id, recipient_id)
            .await?;

        let outcome = self
            .ctx
            .message_store()
            .acknowledge(message_id, recipient_id, Utc::now())
            .await?;

        if outcome.changed {
            info!(
                message_id = %message_id,
                unread_count = outcome.unread_count,
                status = %outcome.status,
                "Message acknowledged"
            );
            self.publish_status_update(&outcome).await;
        } else {
            debug!(message_id = %message_id, "Acknowledgement was a no-op");
        }

        Ok(outcome)
    }

    /// Record that a live recipient received the message: `PENDING -> SENT`
    #[instrument(skip(self))]
    pub async fn mark_delivered(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
    ) -> ServiceResult<AckOutcome> {
        self.ensure_recipient_in_room(message_id, recipient_id)
            .await?;

        let outcome = self
            .ctx
            .message_store()
            .mark_delivered(message_id, recipient_id, Utc::now())
            .await?;

        if outcome.changed {
            debug!(message_id = %message_id, "Message delivered");
            self.publish_status_update(&outcome).await;
        }

        Ok(outcome)
    }

    async fn ensure_recipient_in_room(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
    ) -> ServiceResult<()> {
        let message = self
            .ctx
            .message_store()
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound(message_id))?;

        if !self
            .ctx
            .room_repo()
            .is_member(message.room_id, recipient_id)
            .await?
        {
            return Err(DomainError::AccessDenied {
                room_id: message.room_id,
                member_id: recipient_id,
            }
            .into());
        }

        Ok(())
    }

    async fn publish_status_update(&self, outcome: &AckOutcome) {
        let event = RoomEvent::status_updated(outcome);
        if let Err(e) = self.ctx.publisher().publish(&event).await {
            warn!(
                message_id = %outcome.message_id,
                room_id = %outcome.room_id,
                error = %e,
                "Failed to publish MESSAGE_STATUS_UPDATE"
            );
        }
    }
}
