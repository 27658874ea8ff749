use crate::error::{PlaybackError, Result};
use crate::types::{Epoch, GuildId, Track};
use tokio::sync::broadcast;

/// Playback notification broadcast to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// A stream started for `track`
    TrackStarted {
        guild: GuildId,
        track: Track,
        epoch: Epoch,
    },

    /// The transport failed to start or keep playing `track`
    TrackFailed {
        guild: GuildId,
        track: Track,
        reason: String,
    },

    /// Too many consecutive transport failures; the guild went idle
    AutoAdvanceHalted {
        guild: GuildId,
        /// Tracks left in the queue
        remaining: usize,
    },

    /// The last queued track ended and the guild went idle
    QueueFinished { guild: GuildId },

    /// Playback was stopped explicitly and the queue cleared
    Stopped { guild: GuildId },
}

impl PlaybackEvent {
    /// Guild the event belongs to
    pub fn guild(&self) -> GuildId {
        match self {
            PlaybackEvent::TrackStarted { guild, .. }
            | PlaybackEvent::TrackFailed { guild, .. }
            | PlaybackEvent::AutoAdvanceHalted { guild, .. }
            | PlaybackEvent::QueueFinished { guild }
            | PlaybackEvent::Stopped { guild } => *guild,
        }
    }
}

/// Receiver for playback events
pub struct EventReceiver {
    rx: broadcast::Receiver<PlaybackEvent>,
}

impl EventReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<PlaybackEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event
    ///
    /// Fails once the registry is dropped, or if this receiver fell behind
    /// and missed events.
    pub async fn recv(&mut self) -> Result<PlaybackEvent> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => {
                PlaybackError::EventChannel("closed".to_string())
            }
            broadcast::error::RecvError::Lagged(n) => {
                PlaybackError::EventChannel(format!("lagged by {} messages", n))
            }
        })
    }

    /// Try to receive an event without waiting
    ///
    /// Returns `Ok(None)` if no event is pending.
    pub fn try_recv(&mut self) -> Result<Option<PlaybackEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => {
                Err(PlaybackError::EventChannel("closed".to_string()))
            }
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(PlaybackError::EventChannel(format!("lagged by {} messages", n)))
            }
        }
    }
}
