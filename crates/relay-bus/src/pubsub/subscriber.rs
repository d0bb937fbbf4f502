//! Redis Pub/Sub subscriber.
//!
//! Pattern-subscribes to room channels and fans received payloads out to
//! in-process receivers. The background listener reconnects after transport
//! errors and re-issues every active pattern subscription.

use crate::pubsub::RoomChannel;
use futures_util::StreamExt;
use redis::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Error type for subscriber operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for subscriber operations
pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// Message received from Pub/Sub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Channel the message was published on
    pub channel: String,
    /// Raw payload
    pub payload: String,
}

impl ReceivedMessage {
    #[must_use]
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Room channel this message arrived on, if the name is well formed
    #[must_use]
    pub fn room_channel(&self) -> Option<RoomChannel> {
        RoomChannel::parse(&self.channel)
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Channel buffer size for broadcast
    pub broadcast_buffer: usize,
    /// Delay before reconnecting after a transport error
    pub reconnect_delay: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

/// Redis Pub/Sub pattern subscriber
pub struct Subscriber {
    /// Currently active patterns
    patterns: Arc<RwLock<HashSet<String>>>,
    /// Broadcast sender for messages
    broadcast_tx: broadcast::Sender<ReceivedMessage>,
    /// Control channel for subscription management
    control_tx: mpsc::Sender<SubscriberCommand>,
}

/// Commands for subscription management
#[derive(Debug)]
enum SubscriberCommand {
    PSubscribe(Vec<String>),
    PUnsubscribe(Vec<String>),
    Shutdown,
}

impl Subscriber {
    /// Create a subscriber and start the background listener
    pub fn new(config: SubscriberConfig) -> Self {
        Self::with_patterns(config, HashSet::new())
    }

    /// Start the listener with patterns that are subscribed on (re)connect
    fn with_patterns(config: SubscriberConfig, initial: HashSet<String>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer.max(1));
        let (control_tx, control_rx) = mpsc::channel(32);
        let patterns = Arc::new(RwLock::new(initial));

        tokio::spawn(Self::listener_loop(
            config,
            patterns.clone(),
            broadcast_tx.clone(),
            control_rx,
        ));

        Self {
            patterns,
            broadcast_tx,
            control_tx,
        }
    }

    /// Background listener loop
    async fn listener_loop(
        config: SubscriberConfig,
        patterns: Arc<RwLock<HashSet<String>>>,
        broadcast_tx: broadcast::Sender<ReceivedMessage>,
        mut control_rx: mpsc::Receiver<SubscriberCommand>,
    ) {
        loop {
            match Self::run_listener(&config, &patterns, &broadcast_tx, &mut control_rx).await {
                Ok(()) => {
                    tracing::info!("Subscriber shutting down");
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        delay_ms = config.reconnect_delay.as_millis() as u64,
                        "Subscriber error, reconnecting"
                    );
                    if !Self::wait_reconnect(config.reconnect_delay, &patterns, &mut control_rx)
                        .await
                    {
                        tracing::info!("Subscriber shut down while disconnected");
                        break;
                    }
                }
            }
        }
    }

    /// Sleep out the reconnect delay while still honouring commands.
    /// Returns `false` if a shutdown was requested.
    async fn wait_reconnect(
        delay: Duration,
        patterns: &RwLock<HashSet<String>>,
        control_rx: &mut mpsc::Receiver<SubscriberCommand>,
    ) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                cmd = control_rx.recv() => match cmd {
                    Some(SubscriberCommand::PSubscribe(added)) => {
                        patterns.write().await.extend(added);
                    }
                    Some(SubscriberCommand::PUnsubscribe(removed)) => {
                        let mut active = patterns.write().await;
                        for pattern in &removed {
                            active.remove(pattern);
                        }
                    }
                    Some(SubscriberCommand::Shutdown) | None => return false,
                },
            }
        }
    }

    /// Run the listener until a transport error (`Err`) or shutdown (`Ok`)
    async fn run_listener(
        config: &SubscriberConfig,
        patterns: &RwLock<HashSet<String>>,
        broadcast_tx: &broadcast::Sender<ReceivedMessage>,
        control_rx: &mut mpsc::Receiver<SubscriberCommand>,
    ) -> SubscriberResult<()> {
        let client = Client::open(config.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        // Re-issue every active pattern
        let active: Vec<String> = patterns.read().await.iter().cloned().collect();
        for pattern in &active {
            pubsub.psubscribe(pattern).await?;
        }

        tracing::info!(patterns = ?active, "Subscriber connected to Redis");

        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                // Handle incoming messages
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        return Err(SubscriberError::Connection("Pub/Sub stream ended".to_string()));
                    };

                    let channel = msg.get_channel_name().to_string();
                    match msg.get_payload::<String>() {
                        Ok(payload) => {
                            tracing::trace!(channel = %channel, "Received Pub/Sub message");
                            // No receivers is fine; the relay may not have started yet
                            let _ = broadcast_tx.send(ReceivedMessage { channel, payload });
                        }
                        Err(e) => {
                            tracing::warn!(channel = %channel, error = %e, "Dropping non-text Pub/Sub payload");
                        }
                    }
                }

                // Handle control commands
                cmd = control_rx.recv() => {
                    match cmd {
                        Some(SubscriberCommand::PSubscribe(added)) => {
                            drop(stream);
                            for pattern in added {
                                let result = pubsub.psubscribe(&pattern).await;
                                patterns.write().await.insert(pattern.clone());
                                if let Err(e) = result {
                                    tracing::error!(pattern = %pattern, error = %e, "Failed to psubscribe");
                                    return Err(e.into());
                                }
                                tracing::debug!(pattern = %pattern, "Subscribed to pattern");
                            }
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::PUnsubscribe(removed)) => {
                            drop(stream);
                            for pattern in removed {
                                patterns.write().await.remove(&pattern);
                                if let Err(e) = pubsub.punsubscribe(&pattern).await {
                                    tracing::error!(pattern = %pattern, error = %e, "Failed to punsubscribe");
                                    return Err(e.into());
                                }
                                tracing::debug!(pattern = %pattern, "Unsubscribed from pattern");
                            }
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::Shutdown) | None => {
                            drop(stream);
                            for pattern in patterns.read().await.iter() {
                                if let Err(e) = pubsub.punsubscribe(pattern).await {
                                    tracing::debug!(pattern = %pattern, error = %e, "Unsubscribe on shutdown failed");
                                }
                            }
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Subscribe to channel patterns
    pub async fn psubscribe(&self, patterns: &[&str]) -> SubscriberResult<()> {
        let patterns = patterns.iter().map(|p| (*p).to_string()).collect();

        self.control_tx
            .send(SubscriberCommand::PSubscribe(patterns))
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }

    /// Unsubscribe from channel patterns
    pub async fn punsubscribe(&self, patterns: &[&str]) -> SubscriberResult<()> {
        let patterns = patterns.iter().map(|p| (*p).to_string()).collect();

        self.control_tx
            .send(SubscriberCommand::PUnsubscribe(patterns))
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }

    /// Get a receiver for broadcast messages
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedMessage> {
        self.broadcast_tx.subscribe()
    }

    /// Get currently active patterns
    pub async fn patterns(&self) -> Vec<String> {
        self.patterns.read().await.iter().cloned().collect()
    }

    /// Unsubscribe everything and stop the background listener
    pub async fn shutdown(&self) -> SubscriberResult<()> {
        self.control_tx
            .send(SubscriberCommand::Shutdown)
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }

    /// Whether the background listener has exited
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.control_tx.is_closed()
    }
}

/// Builder for subscriber
pub struct SubscriberBuilder {
    config: SubscriberConfig,
    initial_patterns: HashSet<String>,
}

impl SubscriberBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SubscriberConfig::default(),
            initial_patterns: HashSet::new(),
        }
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = url.into();
        self
    }

    #[must_use]
    pub fn broadcast_buffer(mut self, size: usize) -> Self {
        self.config.broadcast_buffer = size;
        self
    }

    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    /// Pattern subscribed as soon as the listener connects
    #[must_use]
    pub fn psubscribe(mut self, pattern: impl Into<String>) -> Self {
        self.initial_patterns.insert(pattern.into());
        self
    }

    /// Build and start the subscriber
    #[must_use]
    pub fn build(self) -> Subscriber {
        Subscriber::with_patterns(self.config, self.initial_patterns)
    }
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}
