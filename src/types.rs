use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Guild (room) identifier
pub type GuildId = u64;

/// Voice channel identifier
pub type ChannelId = u64;

/// Identifier minted for each acquired output session
pub type SessionId = Uuid;

/// Volume of a guild that never changed it
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Per-guild playback generation counter
///
/// Every stream start and every manual termination moves the epoch forward.
/// Completion notifications carry the epoch they were issued for, and only a
/// notification for the current epoch may drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    /// Wrap a raw counter value
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }

    /// The epoch that follows this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved (or partially resolved) track metadata
///
/// Tracks are immutable once built. A track returned by a lightweight search
/// may lack a stream locator; it has to go through a second resolution step
/// before it can be queued or played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    title: String,
    duration_seconds: u64,
    thumbnail_url: String,
    webpage_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stream_locator: Option<String>,
}

impl Track {
    /// Create a track without a stream locator
    pub fn new(
        title: impl Into<String>,
        duration_seconds: u64,
        thumbnail_url: impl Into<String>,
        webpage_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            duration_seconds,
            thumbnail_url: thumbnail_url.into(),
            webpage_url: webpage_url.into(),
            stream_locator: None,
        }
    }

    /// Return a copy of this track carrying the given stream locator
    pub fn with_stream_locator(mut self, locator: impl Into<String>) -> Self {
        self.stream_locator = Some(locator.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    pub fn thumbnail_url(&self) -> &str {
        &self.thumbnail_url
    }

    pub fn webpage_url(&self) -> &str {
        &self.webpage_url
    }

    pub fn stream_locator(&self) -> Option<&str> {
        self.stream_locator.as_deref()
    }

    /// Whether the track can be handed to a session as-is
    pub fn is_playable(&self) -> bool {
        self.stream_locator.as_deref().is_some_and(|l| !l.is_empty())
    }

    /// Duration formatted as `m:ss`
    pub fn display_duration(&self) -> String {
        let minutes = self.duration_seconds / 60;
        let seconds = self.duration_seconds % 60;
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Playback phase of a guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// How a stream ended, as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Natural end of stream
    Finished,
    /// The transport failed mid-stream or could not open the stream
    Failed(String),
}

/// Result of `enqueue_or_play`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The guild was idle and the track started immediately
    Started,
    /// The track was appended to the queue at this 1-based position
    Queued { position: usize },
}

/// Result of `skip` / `skip_to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// Track that was interrupted
    pub skipped: Track,
    /// Queued tracks dropped unplayed on the way to the new track
    pub discarded: usize,
    /// Track playing afterwards, `None` if the guild went idle
    pub now_playing: Option<Track>,
}

/// Consistent snapshot of a guild's playback state
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatus {
    pub guild: GuildId,
    pub phase: Phase,
    pub current: Option<Track>,
    pub queue: Vec<Track>,
    pub volume: f32,
    pub epoch: Epoch,
    /// Live session, if any
    pub session: Option<SessionId>,
}
