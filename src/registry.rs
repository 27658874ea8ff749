use crate::completion::{dispatch_completions, Completion};
use crate::config::PlayerConfig;
use crate::controller::PlaybackController;
use crate::events::{EventReceiver, PlaybackEvent};
use crate::room::Room;
use crate::session::AudioTransport;
use crate::types::GuildId;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Process-wide map from guild to its playback controller
///
/// Rooms are created on first use and live as long as the registry. The
/// registry also owns the completion channel: sessions report end-of-stream
/// through it, and a background task routes each report to its guild.
///
/// Must be created from within a Tokio runtime.
///
/// # Example
///
/// ```no_run
/// use guild_jukebox::{AudioTransport, ControllerRegistry, Track};
/// use std::sync::Arc;
///
/// # async fn example(transport: Arc<dyn AudioTransport>) -> guild_jukebox::Result<()> {
/// let registry = ControllerRegistry::new(transport);
/// let mut events = registry.subscribe();
///
/// let track = Track::new("Song", 212, "https://i.example.com/1.jpg", "https://example.com/1")
///     .with_stream_locator("https://cdn.example.com/1.webm");
/// registry.room(1234).enqueue_or_play(42, track).await?;
///
/// while let Ok(event) = events.recv().await {
///     println!("{:?}", event);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ControllerRegistry {
    transport: Arc<dyn AudioTransport>,
    config: PlayerConfig,
    rooms: Arc<Mutex<HashMap<GuildId, Room>>>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    events: broadcast::Sender<PlaybackEvent>,
    dispatcher: JoinHandle<()>,
}

impl ControllerRegistry {
    /// Create a registry with the default configuration
    pub fn new(transport: Arc<dyn AudioTransport>) -> Self {
        Self::with_config(transport, PlayerConfig::default())
    }

    /// Create a registry with an explicit configuration
    ///
    /// The configuration is expected to be valid; see [`PlayerConfig::validate`].
    pub fn with_config(transport: Arc<dyn AudioTransport>, config: PlayerConfig) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let rooms = Arc::new(Mutex::new(HashMap::new()));

        let dispatcher = tokio::spawn(dispatch_completions(completion_rx, rooms.clone()));

        Self {
            transport,
            config,
            rooms,
            completion_tx,
            events,
            dispatcher,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Get the room for `guild`, creating it on first reference
    pub fn room(&self, guild: GuildId) -> Room {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms
            .entry(guild)
            .or_insert_with(|| {
                tracing::debug!("Creating playback controller for guild {}", guild);
                Room::new(PlaybackController::new(
                    guild,
                    self.transport.clone(),
                    &self.config,
                    self.completion_tx.clone(),
                    self.events.clone(),
                ))
            })
            .clone()
    }

    /// Get the room for `guild` if it was already created
    pub fn get(&self, guild: GuildId) -> Option<Room> {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.get(&guild).cloned()
    }

    /// Number of guilds referenced so far
    pub fn room_count(&self) -> usize {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.len()
    }

    /// Guilds referenced so far
    pub fn guilds(&self) -> Vec<GuildId> {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.keys().copied().collect()
    }

    /// Subscribe to playback events from every guild
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.events.subscribe())
    }

    /// Stop every active guild and release all sessions
    ///
    /// Guilds are stopped in parallel. Rooms remain usable afterwards.
    pub async fn shutdown(&self) {
        let rooms: Vec<Room> = {
            let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
            rooms.values().cloned().collect()
        };

        tracing::info!("Shutting down playback for {} guild(s)", rooms.len());
        join_all(rooms.iter().map(|room| room.shutdown())).await;
    }
}

impl Drop for ControllerRegistry {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
