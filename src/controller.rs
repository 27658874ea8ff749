//! Per-guild playback state machine
//!
//! ```text
//!            start / enqueue_or_play
//!   Idle ─────────────────────────────▶ Playing ◀──┐
//!    ▲                                   │  ▲      │ skip, skip_to,
//!    │ stop, queue exhausted,      pause │  │ resume  completion
//!    │ failure streak                    ▼  │      │ (next track)
//!    └────────────────────────────────── Paused ───┘
//! ```
//!
//! Every stream start mints a new epoch and hands the session a completion
//! handle tagged with it. Manual terminations move the epoch forward before
//! the stream is torn down, so a completion that was already in flight for
//! the old stream no longer matches and is dropped.

use crate::completion::{Completion, CompletionHandle};
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::queue::TrackQueue;
use crate::session::{AudioTransport, Session};
use crate::types::{
    ChannelId, CompletionOutcome, Epoch, GuildId, Phase, PlayOutcome, RoomStatus, SessionId,
    Skipped, Track,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Transport failures within one operation before auto-advance gives up.
/// The first failure advances to the next track, the second halts.
const MAX_CONSECUTIVE_FAILURES: u32 = 2;

/// Session acquired for the current run of tracks
struct LiveSession {
    id: SessionId,
    inner: Box<dyn Session>,
}

/// Everything that exists only while the guild is not idle
struct ActivePlayback {
    session: LiveSession,
    current: Track,
    paused: bool,
}

/// Playback state machine for one guild
///
/// Not synchronized by itself: the owning [`Room`](crate::Room) keeps it
/// behind an async mutex so every operation for a guild runs alone.
pub(crate) struct PlaybackController {
    guild: GuildId,
    transport: Arc<dyn AudioTransport>,
    active: Option<ActivePlayback>,
    queue: TrackQueue,
    volume: f32,
    epoch: Epoch,
    /// Transport failures since the last successful stream start
    failure_streak: u32,
    completion_tx: mpsc::UnboundedSender<Completion>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackController {
    pub(crate) fn new(
        guild: GuildId,
        transport: Arc<dyn AudioTransport>,
        config: &PlayerConfig,
        completion_tx: mpsc::UnboundedSender<Completion>,
        events: broadcast::Sender<PlaybackEvent>,
    ) -> Self {
        Self {
            guild,
            transport,
            active: None,
            queue: TrackQueue::new(),
            volume: config.default_volume,
            epoch: Epoch::default(),
            failure_streak: 0,
            completion_tx,
            events,
        }
    }

    // ========== Queries ==========

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    pub fn phase(&self) -> Phase {
        match &self.active {
            None => Phase::Idle,
            Some(active) if active.paused => Phase::Paused,
            Some(_) => Phase::Playing,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.active.as_ref().map(|a| a.current.clone())
    }

    pub fn snapshot_queue(&self) -> Vec<Track> {
        self.queue.snapshot()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.size()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|a| a.session.id)
    }

    pub fn status(&self) -> RoomStatus {
        RoomStatus {
            guild: self.guild,
            phase: self.phase(),
            current: self.current_track(),
            queue: self.snapshot_queue(),
            volume: self.volume,
            epoch: self.epoch,
            session: self.session_id(),
        }
    }

    // ========== Starting playback ==========

    /// Connect to `channel` and play `track` right away
    ///
    /// Only valid while idle.
    pub async fn start(&mut self, channel: ChannelId, track: Track) -> Result<()> {
        if let Some(active) = &self.active {
            let current = active.session.inner.channel();
            if current != channel {
                return Err(PlaybackError::ChannelConflict {
                    current,
                    requested: channel,
                });
            }
            return Err(PlaybackError::InvalidOperation("already playing".to_string()));
        }
        let locator = playable_locator(&track)?.to_string();

        let inner = self.transport.acquire(self.guild, channel).await?;
        let mut session = LiveSession {
            id: Uuid::new_v4(),
            inner,
        };
        tracing::info!(
            "Guild {}: acquired session {} on channel {}",
            self.guild,
            session.id,
            channel
        );

        let epoch = self.bump_epoch();
        let handle = self.completion_handle(epoch);
        if let Err(e) = session.inner.start(&locator, self.volume, handle) {
            tracing::warn!("Guild {}: failed to start '{}': {}", self.guild, track.title(), e);
            tracing::info!("Guild {}: releasing session {}", self.guild, session.id);
            session.inner.release();
            return Err(e.into_transport_failure());
        }

        tracing::info!(
            "Guild {}: now playing '{}' (epoch {})",
            self.guild,
            track.title(),
            epoch
        );
        self.failure_streak = 0;
        self.active = Some(ActivePlayback {
            session,
            current: track.clone(),
            paused: false,
        });
        self.emit(PlaybackEvent::TrackStarted {
            guild: self.guild,
            track,
            epoch,
        });
        Ok(())
    }

    /// Append a playable track to the queue, returning its 1-based position
    pub fn enqueue(&mut self, track: Track) -> Result<usize> {
        playable_locator(&track)?;
        tracing::debug!("Guild {}: queued '{}'", self.guild, track.title());
        self.queue.enqueue(track);
        Ok(self.queue.size())
    }

    /// Queue the track if something is playing, otherwise start it
    pub async fn enqueue_or_play(&mut self, channel: ChannelId, track: Track) -> Result<PlayOutcome> {
        if self.is_active() {
            let position = self.enqueue(track)?;
            Ok(PlayOutcome::Queued { position })
        } else {
            self.start(channel, track).await?;
            Ok(PlayOutcome::Started)
        }
    }

    // ========== Completion ==========

    /// Handle the end of the stream started under `epoch`
    ///
    /// A completion for any other epoch describes a stream that was already
    /// replaced or stopped and is ignored.
    pub fn on_track_complete(&mut self, epoch: Epoch, outcome: CompletionOutcome) {
        if epoch != self.epoch || self.active.is_none() {
            tracing::debug!(
                "Guild {}: ignoring stale completion (epoch {}, current {})",
                self.guild,
                epoch,
                self.epoch
            );
            return;
        }

        match outcome {
            CompletionOutcome::Finished => {
                tracing::debug!("Guild {}: track finished (epoch {})", self.guild, epoch);
                self.failure_streak = 0;
            }
            CompletionOutcome::Failed(reason) => {
                if let Some(track) = self.current_track() {
                    tracing::warn!(
                        "Guild {}: transport failure while playing '{}': {}",
                        self.guild,
                        track.title(),
                        reason
                    );
                    self.emit(PlaybackEvent::TrackFailed {
                        guild: self.guild,
                        track,
                        reason,
                    });
                }
                if !self.record_failure() {
                    self.halt();
                    return;
                }
            }
        }

        let next = self.queue.dequeue_front();
        self.advance(next);
    }

    // ========== Transport control ==========

    pub fn pause(&mut self) -> Result<()> {
        match self.active.as_mut() {
            Some(active) if !active.paused => {
                active.session.inner.pause()?;
                active.paused = true;
                tracing::debug!("Guild {}: paused", self.guild);
                Ok(())
            }
            _ => Err(PlaybackError::InvalidOperation("not playing".to_string())),
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match self.active.as_mut() {
            Some(active) if active.paused => {
                active.session.inner.resume()?;
                active.paused = false;
                tracing::debug!("Guild {}: resumed", self.guild);
                Ok(())
            }
            _ => Err(PlaybackError::InvalidOperation("not paused".to_string())),
        }
    }

    /// Stop playback, release the session and clear the queue
    pub fn stop(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Err(PlaybackError::InvalidOperation("not playing".to_string()));
        };
        self.bump_epoch();

        let ActivePlayback {
            mut session,
            current,
            ..
        } = active;
        if let Err(e) = session.inner.stop() {
            tracing::warn!("Guild {}: stopping '{}' failed: {}", self.guild, current.title(), e);
        }
        tracing::info!("Guild {}: releasing session {}", self.guild, session.id);
        session.inner.release();

        let cleared = self.queue.clear();
        self.failure_streak = 0;
        tracing::info!(
            "Guild {}: stopped '{}', cleared {} queued track(s)",
            self.guild,
            current.title(),
            cleared
        );
        self.emit(PlaybackEvent::Stopped { guild: self.guild });
        Ok(())
    }

    /// Interrupt the current track and play the next queued one
    pub fn skip(&mut self) -> Result<Skipped> {
        let skipped = self.interrupt_current()?;
        let next = self.queue.dequeue_front();
        self.advance(next);
        Ok(Skipped {
            skipped,
            discarded: 0,
            now_playing: self.current_track(),
        })
    }

    /// Interrupt the current track and jump to queue position `n`
    ///
    /// Tracks queued before position `n` are discarded unplayed.
    pub fn skip_to(&mut self, n: usize) -> Result<Skipped> {
        if !self.is_active() {
            return Err(PlaybackError::InvalidOperation("not playing".to_string()));
        }
        let len = self.queue.size();
        if !(1..=len).contains(&n) {
            return Err(PlaybackError::OutOfRange { index: n, len });
        }

        let skipped = self.interrupt_current()?;
        let next = self.queue.dequeue_at(n);
        tracing::debug!("Guild {}: skipping to position {} of {}", self.guild, n, len);
        self.advance(next);
        Ok(Skipped {
            skipped,
            discarded: n - 1,
            now_playing: self.current_track(),
        })
    }

    /// Set the guild volume, applying it live if a stream is running
    pub fn set_volume(&mut self, level: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&level) {
            return Err(PlaybackError::InvalidOperation(format!(
                "volume must be between 0.0 and 1.0, got {}",
                level
            )));
        }

        self.volume = level;
        tracing::debug!("Guild {}: volume set to {}", self.guild, level);
        if let Some(active) = self.active.as_mut() {
            active.session.inner.set_volume(level)?;
        }
        Ok(())
    }

    // ========== Queue editing ==========

    /// Remove the queued track at 1-based position `n`
    pub fn remove_at(&mut self, n: usize) -> Result<Track> {
        let len = self.queue.size();
        let removed = self
            .queue
            .remove_at(n)
            .ok_or(PlaybackError::OutOfRange { index: n, len })?;
        tracing::debug!("Guild {}: removed '{}' from position {}", self.guild, removed.title(), n);
        Ok(removed)
    }

    /// Drop all queued tracks, returning how many were removed
    pub fn clear_queue(&mut self) -> usize {
        let cleared = self.queue.clear();
        tracing::debug!("Guild {}: cleared {} queued track(s)", self.guild, cleared);
        cleared
    }

    /// Shuffle the queue, returning its length
    pub fn shuffle(&mut self) -> usize {
        self.queue.shuffle();
        tracing::debug!("Guild {}: shuffled {} queued track(s)", self.guild, self.queue.size());
        self.queue.size()
    }

    /// Stop whatever is playing; used when the registry shuts down
    pub(crate) fn shutdown(&mut self) {
        if self.is_active() {
            if let Err(e) = self.stop() {
                tracing::warn!("Guild {}: stop during shutdown failed: {}", self.guild, e);
            }
        }
    }

    // ========== Internals ==========

    /// Stop the current stream for a skip, keeping the session
    fn interrupt_current(&mut self) -> Result<Track> {
        let Some(active) = self.active.as_mut() else {
            return Err(PlaybackError::InvalidOperation("not playing".to_string()));
        };
        if let Err(e) = active.session.inner.stop() {
            tracing::warn!(
                "Guild {}: stopping '{}' failed: {}",
                self.guild,
                active.current.title(),
                e
            );
        }
        let skipped = active.current.clone();
        self.bump_epoch();
        self.failure_streak = 0;
        Ok(skipped)
    }

    /// Play `next` on the live session, or go idle when there is nothing left
    ///
    /// A track that fails to start counts towards the failure streak; while
    /// the streak allows it, the following queued track is tried instead.
    /// A successful start ends the streak, so the bound applies per call.
    fn advance(&mut self, mut next: Option<Track>) {
        loop {
            let Some(track) = next.take() else {
                self.release_session();
                tracing::info!("Guild {}: queue finished", self.guild);
                self.emit(PlaybackEvent::QueueFinished { guild: self.guild });
                return;
            };

            let epoch = self.bump_epoch();
            let handle = self.completion_handle(epoch);
            let volume = self.volume;
            let Some(active) = self.active.as_mut() else {
                return;
            };

            let started = match track.stream_locator() {
                Some(locator) => active.session.inner.start(locator, volume, handle),
                None => Err(PlaybackError::InvalidOperation("track has no stream locator".to_string())),
            };

            match started {
                Ok(()) => {
                    active.current = track.clone();
                    active.paused = false;
                    self.failure_streak = 0;
                    tracing::info!(
                        "Guild {}: now playing '{}' (epoch {})",
                        self.guild,
                        track.title(),
                        epoch
                    );
                    self.emit(PlaybackEvent::TrackStarted {
                        guild: self.guild,
                        track,
                        epoch,
                    });
                    return;
                }
                Err(e) => {
                    let reason = e.into_transport_failure().to_string();
                    tracing::warn!("Guild {}: failed to start '{}': {}", self.guild, track.title(), reason);
                    self.emit(PlaybackEvent::TrackFailed {
                        guild: self.guild,
                        track,
                        reason,
                    });
                    if !self.record_failure() {
                        self.halt();
                        return;
                    }
                    next = self.queue.dequeue_front();
                }
            }
        }
    }

    /// Count a transport failure; false once the streak reached the limit
    fn record_failure(&mut self) -> bool {
        self.failure_streak += 1;
        self.failure_streak < MAX_CONSECUTIVE_FAILURES
    }

    /// Give up on auto-advance after repeated failures
    fn halt(&mut self) {
        tracing::warn!(
            "Guild {}: {} consecutive transport failures, halting with {} track(s) queued",
            self.guild,
            self.failure_streak,
            self.queue.size()
        );
        self.release_session();
        self.emit(PlaybackEvent::AutoAdvanceHalted {
            guild: self.guild,
            remaining: self.queue.size(),
        });
    }

    /// Drop back to idle, tearing down the session
    fn release_session(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::info!("Guild {}: releasing session {}", self.guild, active.session.id);
            active.session.inner.release();
        }
        self.failure_streak = 0;
    }

    fn bump_epoch(&mut self) -> Epoch {
        self.epoch = self.epoch.next();
        self.epoch
    }

    fn completion_handle(&self, epoch: Epoch) -> CompletionHandle {
        CompletionHandle::new(self.guild, epoch, self.completion_tx.clone())
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn playable_locator(track: &Track) -> Result<&str> {
    match track.stream_locator() {
        Some(locator) if !locator.is_empty() => Ok(locator),
        _ => Err(PlaybackError::InvalidOperation(format!(
            "'{}' has no stream locator",
            track.title()
        ))),
    }
}
