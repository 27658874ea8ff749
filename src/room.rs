use crate::controller::PlaybackController;
use crate::error::Result;
use crate::resolver::{ensure_playable, MetadataResolver};
use crate::types::{
    ChannelId, CompletionOutcome, Epoch, GuildId, Phase, PlayOutcome, RoomStatus, Skipped, Track,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Interface for controlling one guild's playback
///
/// A `Room` is a cheap, cloneable handle. Every call takes the guild's lock,
/// so operations on one guild never interleave while different guilds run
/// fully in parallel.
#[derive(Clone)]
pub struct Room {
    guild: GuildId,
    controller: Arc<Mutex<PlaybackController>>,
}

impl Room {
    pub(crate) fn new(controller: PlaybackController) -> Self {
        Self {
            guild: controller.guild(),
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    /// Get the guild ID
    pub fn guild(&self) -> GuildId {
        self.guild
    }

    // ========== Queries ==========

    /// Get a snapshot of the complete playback state
    ///
    /// All fields come from a single lock acquisition, so they are
    /// consistent with each other.
    pub async fn status(&self) -> RoomStatus {
        self.controller.lock().await.status()
    }

    pub async fn phase(&self) -> Phase {
        self.controller.lock().await.phase()
    }

    /// Whether a track is playing or paused
    pub async fn is_active(&self) -> bool {
        self.controller.lock().await.is_active()
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.controller.lock().await.current_track()
    }

    /// Copy of the pending queue in play order
    pub async fn snapshot_queue(&self) -> Vec<Track> {
        self.controller.lock().await.snapshot_queue()
    }

    pub async fn queue_len(&self) -> usize {
        self.controller.lock().await.queue_len()
    }

    pub async fn volume(&self) -> f32 {
        self.controller.lock().await.volume()
    }

    pub async fn epoch(&self) -> Epoch {
        self.controller.lock().await.epoch()
    }

    // ========== Playback ==========

    /// Play `track` on `channel` immediately; the guild must be idle
    pub async fn start(&self, channel: ChannelId, track: Track) -> Result<()> {
        self.controller.lock().await.start(channel, track).await
    }

    /// Append a playable track to the queue without starting anything
    pub async fn enqueue(&self, track: Track) -> Result<usize> {
        self.controller.lock().await.enqueue(track)
    }

    /// Queue the track if the guild is busy, otherwise start playing it
    pub async fn enqueue_or_play(&self, channel: ChannelId, track: Track) -> Result<PlayOutcome> {
        self.controller.lock().await.enqueue_or_play(channel, track).await
    }

    /// Resolve `query` and queue or play the result
    ///
    /// Resolution runs before the guild's lock is taken, so a slow lookup
    /// never holds up other commands for this guild.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use guild_jukebox::{ControllerRegistry, MetadataResolver, AudioTransport, PlayOutcome};
    /// # use std::sync::Arc;
    /// # async fn example(
    /// #     transport: Arc<dyn AudioTransport>,
    /// #     resolver: &dyn MetadataResolver,
    /// # ) -> guild_jukebox::Result<()> {
    /// let registry = ControllerRegistry::new(transport);
    /// let room = registry.room(1234);
    /// match room.play_query(resolver, 42, "https://youtu.be/dQw4w9WgXcQ").await? {
    ///     PlayOutcome::Started => println!("Now playing"),
    ///     PlayOutcome::Queued { position } => println!("Queued at position {}", position),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn play_query(
        &self,
        resolver: &dyn MetadataResolver,
        channel: ChannelId,
        query: &str,
    ) -> Result<PlayOutcome> {
        let track = resolver.resolve(query).await?;
        self.play_track(resolver, channel, track).await
    }

    /// Queue or play a possibly partial track (e.g. a search result)
    ///
    /// A missing stream locator is resolved first, outside the guild's lock.
    pub async fn play_track(
        &self,
        resolver: &dyn MetadataResolver,
        channel: ChannelId,
        track: Track,
    ) -> Result<PlayOutcome> {
        let track = ensure_playable(resolver, track).await?;
        self.enqueue_or_play(channel, track).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.controller.lock().await.pause()
    }

    pub async fn resume(&self) -> Result<()> {
        self.controller.lock().await.resume()
    }

    /// Stop playback, disconnect, and clear the queue
    pub async fn stop(&self) -> Result<()> {
        self.controller.lock().await.stop()
    }

    pub async fn skip(&self) -> Result<Skipped> {
        self.controller.lock().await.skip()
    }

    /// Jump to 1-based queue position `n`, discarding the tracks before it
    pub async fn skip_to(&self, n: usize) -> Result<Skipped> {
        self.controller.lock().await.skip_to(n)
    }

    /// Set the volume in [0.0, 1.0]
    pub async fn set_volume(&self, level: f32) -> Result<()> {
        self.controller.lock().await.set_volume(level)
    }

    // ========== Queue editing ==========

    /// Remove the queued track at 1-based position `n`
    pub async fn remove_at(&self, n: usize) -> Result<Track> {
        self.controller.lock().await.remove_at(n)
    }

    pub async fn clear_queue(&self) -> usize {
        self.controller.lock().await.clear_queue()
    }

    pub async fn shuffle(&self) -> usize {
        self.controller.lock().await.shuffle()
    }

    // ========== Transport callbacks ==========

    /// Deliver an end-of-stream notification for `epoch`
    ///
    /// Normally called by the registry's completion dispatcher; transports
    /// that track epochs themselves may call it directly.
    pub async fn on_track_complete(&self, epoch: Epoch, outcome: CompletionOutcome) {
        self.controller.lock().await.on_track_complete(epoch, outcome)
    }

    pub(crate) async fn shutdown(&self) {
        self.controller.lock().await.shutdown()
    }
}
