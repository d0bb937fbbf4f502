//! Service context - dependency container for services
//!
//! Holds the ports every service needs: the room repository, the message
//! store, the event publisher and the Snowflake generator.

use std::sync::Arc;

use relay_core::traits::{EventPublisher, MessageStore, RoomRepository};
use relay_core::{Snowflake, SnowflakeGenerator};

use super::error::{ServiceError, ServiceResult};

/// Service context containing all dependencies
///
/// Cheap to clone; every dependency sits behind an `Arc` so the HTTP
/// handlers, the WebSocket sessions and tests can share one instance.
#[derive(Clone)]
pub struct ServiceContext {
    room_repo: Arc<dyn RoomRepository>,
    message_store: Arc<dyn MessageStore>,
    publisher: Arc<dyn EventPublisher>,
    snowflake_generator: Arc<SnowflakeGenerator>,
}

impl ServiceContext {
    pub fn new(
        room_repo: Arc<dyn RoomRepository>,
        message_store: Arc<dyn MessageStore>,
        publisher: Arc<dyn EventPublisher>,
        snowflake_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            room_repo,
            message_store,
            publisher,
            snowflake_generator,
        }
    }

    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    /// Get the room repository
    pub fn room_repo(&self) -> &dyn RoomRepository {
        self.room_repo.as_ref()
    }

    /// Get the message store
    pub fn message_store(&self) -> &dyn MessageStore {
        self.message_store.as_ref()
    }

    /// Get the room event publisher
    pub fn publisher(&self) -> &dyn EventPublisher {
        self.publisher.as_ref()
    }

    pub fn snowflake_generator(&self) -> &SnowflakeGenerator {
        self.snowflake_generator.as_ref()
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("room_repo", &"dyn RoomRepository")
            .field("message_store", &"dyn MessageStore")
            .field("publisher", &"dyn EventPublisher")
            .field("worker_id", &self.snowflake_generator.worker_id())
            .finish()
    }
}

/// Builder for creating ServiceContext
#[derive(Default)]
pub struct ServiceContextBuilder {
    room_repo: Option<Arc<dyn RoomRepository>>,
    message_store: Option<Arc<dyn MessageStore>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_repo(mut self, repo: Arc<dyn RoomRepository>) -> Self {
        self.room_repo = Some(repo);
        self
    }

    pub fn message_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.message_store = Some(store);
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    /// Build the ServiceContext
    ///
    /// The Snowflake generator defaults to worker 0 when not supplied.
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if a required port is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.room_repo
                .ok_or_else(|| ServiceError::validation("room_repo is required"))?,
            self.message_store
                .ok_or_else(|| ServiceError::validation("message_store is required"))?,
            self.publisher
                .ok_or_else(|| ServiceError::validation("publisher is required"))?,
            self.snowflake_generator.unwrap_or_default(),
        ))
    }
}
