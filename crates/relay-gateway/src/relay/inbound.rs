//! Bus subscriber side of the relay
//!
//! One pattern subscription (`chatroom-*`) feeds every room. Each decoded
//! event is queued on its room's lane; a lane is a task that broadcasts its
//! queue in order, so a slow room never holds up the others.
//!
//! A lane is only ever removed by its own task, once its queue is empty and
//! the room has no local connections. Events for a room are therefore never
//! split across two live lanes.

use crate::connection::ConnectionRegistry;
use parking_lot::Mutex;
use relay_bus::{
    ReceivedMessage, RoomChannel, Subscriber, SubscriberBuilder, SubscriberConfig,
    ROOM_CHANNEL_PATTERN,
};
use relay_core::{DomainError, RoomEvent, Snowflake};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Events queued per room before new ones are dropped
pub const DEFAULT_LANE_BUFFER: usize = 256;

/// Relay lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Inbound relay is already running")]
    AlreadyRunning,
}

/// What happened to one bus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queued on the room's lane
    Queued(Snowflake),
    /// No local connections for the room
    NoLocalConnections(Snowflake),
    /// The room's lane is full; the event was dropped
    LaneFull(Snowflake),
    /// Undecodable or inconsistent message; logged and dropped
    Malformed(String),
}

struct Lane {
    id: u64,
    tx: mpsc::Sender<Arc<str>>,
}

type Lanes = Arc<Mutex<HashMap<Snowflake, Lane>>>;

struct Running {
    subscriber: Subscriber,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Forwards bus events to local connections
pub struct InboundRelay {
    registry: Arc<ConnectionRegistry>,
    lanes: Lanes,
    lane_buffer: usize,
    next_lane_id: AtomicU64,
    running: Mutex<Option<Running>>,
    relayed: AtomicU64,
    dropped: AtomicU64,
}

impl InboundRelay {
    /// Create a stopped relay
    pub fn new(registry: Arc<ConnectionRegistry>, lane_buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            registry,
            lanes: Arc::new(Mutex::new(HashMap::new())),
            lane_buffer: lane_buffer.max(1),
            next_lane_id: AtomicU64::new(0),
            running: Mutex::new(None),
            relayed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Subscribe to `chatroom-*` and start forwarding
    pub fn start(self: &Arc<Self>, config: SubscriberConfig) -> Result<(), RelayError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(RelayError::AlreadyRunning);
        }

        let subscriber = SubscriberBuilder::new()
            .redis_url(config.redis_url)
            .broadcast_buffer(config.broadcast_buffer)
            .reconnect_delay(config.reconnect_delay)
            .psubscribe(ROOM_CHANNEL_PATTERN)
            .build();
        let receiver = subscriber.receiver();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let relay = Arc::clone(self);
        let task = tokio::spawn(async move {
            relay.run(receiver, shutdown_rx).await;
        });

        *running = Some(Running {
            subscriber,
            shutdown_tx,
            task,
        });

        info!(pattern = ROOM_CHANNEL_PATTERN, "Inbound relay started");
        Ok(())
    }

    /// Unsubscribe, stop the receive loop and close every lane
    pub async fn shutdown(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return;
        };

        if let Err(e) = running.subscriber.shutdown().await {
            debug!(error = %e, "Subscriber already stopped");
        }
        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.task.await {
            warn!(error = %e, "Relay task ended abnormally");
        }

        self.lanes.lock().clear();

        info!(
            relayed = self.relayed.load(Ordering::Relaxed),
            dropped = self.dropped.load(Ordering::Relaxed),
            "Inbound relay stopped"
        );
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Number of rooms with an active delivery lane
    pub fn lane_count(&self) -> usize {
        self.lanes.lock().len()
    }

    async fn run(
        &self,
        mut receiver: broadcast::Receiver<ReceivedMessage>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                received = receiver.recv() => match received {
                    Ok(message) => {
                        self.dispatch(&message);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(lagged = n, "Inbound relay lagged behind the bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("Bus receiver closed");
                        break;
                    }
                },
            }
        }

        debug!("Inbound relay loop ended");
    }

    /// Decode a bus message: the room comes from the channel name and must
    /// match the room inside the envelope
    pub fn decode(message: &ReceivedMessage) -> Result<(Snowflake, RoomEvent), DomainError> {
        let channel = RoomChannel::parse(&message.channel).ok_or_else(|| {
            DomainError::MalformedPayload(format!("not a room channel: {}", message.channel))
        })?;

        let event = RoomEvent::from_json(&message.payload)?;
        if event.room_id() != channel.room_id() {
            return Err(DomainError::MalformedPayload(format!(
                "event for room {} published on {}",
                event.room_id(),
                channel
            )));
        }

        Ok((channel.room_id(), event))
    }

    /// Route one bus message to its room's lane
    pub fn dispatch(&self, message: &ReceivedMessage) -> DispatchOutcome {
        let (room_id, event) = match Self::decode(message) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(channel = %message.channel, error = %e, "Dropping bus message");
                return DispatchOutcome::Malformed(e.to_string());
            }
        };

        let mut lanes = self.lanes.lock();

        if self.registry.room_connection_count(room_id) == 0 {
            // An existing lane still drains and then releases itself
            trace!(room_id = %room_id, "No local connections, skipping event");
            return DispatchOutcome::NoLocalConnections(room_id);
        }

        let lane = lanes
            .entry(room_id)
            .and_modify(|lane| {
                if lane.tx.is_closed() {
                    *lane = self.spawn_lane(room_id);
                }
            })
            .or_insert_with(|| self.spawn_lane(room_id));

        match lane.tx.try_send(Arc::from(message.payload.as_str())) {
            Ok(()) => {
                self.relayed.fetch_add(1, Ordering::Relaxed);
                trace!(room_id = %room_id, event = event.event_name(), "Event queued");
                DispatchOutcome::Queued(room_id)
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(room_id = %room_id, error = %e, "Room lane rejected event");
                DispatchOutcome::LaneFull(room_id)
            }
        }
    }

    /// Spawn the delivery task for a room. Called with the lane map locked.
    fn spawn_lane(&self, room_id: Snowflake) -> Lane {
        let id = self.next_lane_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel::<Arc<str>>(self.lane_buffer);
        // Subscribed before the task starts so no vacancy is missed
        let vacated = self.registry.subscribe_vacated();

        tokio::spawn(run_lane(
            room_id,
            id,
            rx,
            vacated,
            Arc::clone(&self.registry),
            Arc::clone(&self.lanes),
        ));

        debug!(room_id = %room_id, lane_id = id, "Room lane opened");
        Lane { id, tx }
    }
}

/// Deliver a room's queue in order until the lane is closed or released
async fn run_lane(
    room_id: Snowflake,
    lane_id: u64,
    mut rx: mpsc::Receiver<Arc<str>>,
    mut vacated: broadcast::Receiver<Snowflake>,
    registry: Arc<ConnectionRegistry>,
    lanes: Lanes,
) {
    loop {
        tokio::select! {
            biased;
            payload = rx.recv() => match payload {
                Some(payload) => {
                    registry.broadcast(room_id, payload).await;
                }
                None => break,
            },
            signal = vacated.recv() => match signal {
                Ok(room) if room != room_id => continue,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                // Not expected while this task holds the registry
                Err(broadcast::error::RecvError::Closed) => {
                    while let Some(payload) = rx.recv().await {
                        registry.broadcast(room_id, payload).await;
                    }
                    break;
                }
            },
        }

        if rx.is_empty()
            && registry.room_connection_count(room_id) == 0
            && release_lane(&lanes, room_id, lane_id, &rx, &registry)
        {
            trace!(room_id = %room_id, lane_id, "Room lane released");
            return;
        }
    }

    trace!(room_id = %room_id, lane_id, "Room lane closed");
}

/// Remove an idle lane from the map. Re-checked under the lock because
/// `dispatch` checks the room and queues while holding it.
fn release_lane(
    lanes: &Mutex<HashMap<Snowflake, Lane>>,
    room_id: Snowflake,
    lane_id: u64,
    rx: &mpsc::Receiver<Arc<str>>,
    registry: &ConnectionRegistry,
) -> bool {
    let mut lanes = lanes.lock();
    if !rx.is_empty() || registry.room_connection_count(room_id) > 0 {
        return false;
    }
    if lanes.get(&room_id).is_some_and(|lane| lane.id == lane_id) {
        lanes.remove(&room_id);
    }
    true
}

impl std::fmt::Debug for InboundRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundRelay")
            .field("running", &self.is_running())
            .field("lanes", &self.lane_count())
            .field("relayed", &self.relayed.load(Ordering::Relaxed))
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish()
    }
}
