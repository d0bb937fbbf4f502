//! In-memory ports shared by the service scenario tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_core::traits::{EventPublisher, MessageQuery, MessageStore, RepoResult, RoomRepository};
use relay_core::{AckOutcome, ChatMessage, ChatRoom, DomainError, RoomEvent, Snowflake};
use relay_service::dto::OpenRoomRequest;
use relay_service::{RoomService, ServiceContext};

pub const ALICE: Snowflake = Snowflake::new(10);
pub const BOB: Snowflake = Snowflake::new(20);
pub const CAROL: Snowflake = Snowflake::new(30);
pub const MALLORY: Snowflake = Snowflake::new(99);

// ============================================================================
// Room repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryRooms {
    rooms: Mutex<HashMap<Snowflake, ChatRoom>>,
}

#[async_trait]
impl RoomRepository for InMemoryRooms {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ChatRoom>> {
        Ok(self.rooms.lock().get(&id).cloned())
    }

    async fn find_by_members(&self, member_ids: &[Snowflake]) -> RepoResult<Option<ChatRoom>> {
        let wanted = ChatRoom::normalize_members(member_ids.iter().copied());
        Ok(self
            .rooms
            .lock()
            .values()
            .find(|room| room.member_ids == wanted)
            .cloned())
    }

    async fn create(&self, room: &ChatRoom) -> RepoResult<()> {
        let mut rooms = self.rooms.lock();
        if rooms.values().any(|r| r.member_ids == room.member_ids) {
            return Ok(());
        }
        rooms.insert(room.id, room.clone());
        Ok(())
    }

    async fn is_member(&self, room_id: Snowflake, member_id: Snowflake) -> RepoResult<bool> {
        Ok(self
            .rooms
            .lock()
            .get(&room_id)
            .is_some_and(|room| room.is_member(member_id)))
    }
}

// ============================================================================
// Message store
// ============================================================================

#[derive(Default)]
pub struct InMemoryMessages {
    messages: Mutex<HashMap<Snowflake, ChatMessage>>,
    fail_writes: AtomicBool,
}

impl InMemoryMessages {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn get(&self, id: Snowflake) -> Option<ChatMessage> {
        self.messages.lock().get(&id).cloned()
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("connection refused".to_string()));
        }
        Ok(())
    }

    fn update(
        &self,
        message_id: Snowflake,
        apply: impl FnOnce(&mut ChatMessage) -> AckOutcome,
    ) -> RepoResult<AckOutcome> {
        self.check_writable()?;
        let mut messages = self.messages.lock();
        let message = messages
            .get_mut(&message_id)
            .ok_or(DomainError::MessageNotFound(message_id))?;
        Ok(apply(message))
    }
}

#[async_trait]
impl MessageStore for InMemoryMessages {
    async fn create(&self, message: &ChatMessage) -> RepoResult<()> {
        self.check_writable()?;
        self.messages.lock().insert(message.id, message.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ChatMessage>> {
        Ok(self.get(id))
    }

    async fn find_by_room(
        &self,
        room_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self
            .messages
            .lock()
            .values()
            .filter(|m| m.room_id == room_id)
            .filter(|m| query.before.map_or(true, |before| m.id < before))
            .filter(|m| query.after.map_or(true, |after| m.id > after))
            .cloned()
            .collect();

        if query.after.is_some() {
            messages.sort_by_key(|m| m.id);
        } else {
            messages.sort_by_key(|m| std::cmp::Reverse(m.id));
        }
        messages.truncate(query.limit as usize);
        Ok(messages)
    }

    async fn acknowledge(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
        now: DateTime<Utc>,
    ) -> RepoResult<AckOutcome> {
        self.update(message_id, |m| m.acknowledge(recipient_id, now))
    }

    async fn mark_delivered(
        &self,
        message_id: Snowflake,
        recipient_id: Snowflake,
        now: DateTime<Utc>,
    ) -> RepoResult<AckOutcome> {
        self.update(message_id, |m| m.mark_delivered(recipient_id, now))
    }
}

// ============================================================================
// Publishers
// ============================================================================

/// Records every published event; can be switched into a failing mode
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<RoomEvent>>,
    down: AtomicBool,
}

impl RecordingPublisher {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<RoomEvent> {
        self.events.lock().clone()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(RoomEvent::event_name).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &RoomEvent) -> RepoResult<u32> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DomainError::BusUnavailable("connection refused".to_string()));
        }
        self.events.lock().push(event.clone());
        Ok(1)
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub ctx: ServiceContext,
    pub rooms: Arc<InMemoryRooms>,
    pub messages: Arc<InMemoryMessages>,
    pub publisher: Arc<RecordingPublisher>,
}

impl Harness {
    pub fn new() -> Self {
        let rooms = Arc::new(InMemoryRooms::default());
        let messages = Arc::new(InMemoryMessages::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let ctx = ServiceContext::builder()
            .room_repo(rooms.clone())
            .message_store(messages.clone())
            .publisher(publisher.clone())
            .build()
            .expect("all ports supplied");

        Self {
            ctx,
            rooms,
            messages,
            publisher,
        }
    }

    /// Open a room for `creator` plus `others` and return its id
    pub async fn open_room(&self, creator: Snowflake, others: &[Snowflake]) -> Snowflake {
        let response = RoomService::new(&self.ctx)
            .open_room(
                creator,
                OpenRoomRequest {
                    member_ids: others.to_vec(),
                },
            )
            .await
            .expect("room opens");
        Snowflake::parse(&response.id).expect("numeric room id")
    }
}

pub fn domain_error(err: &relay_service::ServiceError) -> &DomainError {
    err.as_domain().expect("domain error")
}
