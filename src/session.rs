//! Boundary traits over the audio transport
//!
//! The transport owns decoding and sending audio to a voice channel. This
//! crate only drives it through these traits; implementations live with the
//! chat-platform integration.

use crate::completion::CompletionHandle;
use crate::error::Result;
use crate::types::{ChannelId, GuildId};
use async_trait::async_trait;

/// Factory for output sessions
#[async_trait]
pub trait AudioTransport: Send + Sync {
    /// Connect the guild's output to a voice channel
    ///
    /// Must be idempotent for a guild already bound to `channel`, and fail
    /// with `PlaybackError::ChannelConflict` when the guild's connection is
    /// bound elsewhere. May suspend while a voice handshake completes.
    async fn acquire(&self, guild: GuildId, channel: ChannelId) -> Result<Box<dyn Session>>;
}

/// Live output connection for one guild
///
/// All methods must return promptly: state changes on the wire are
/// acknowledged through the completion handle, never awaited here.
pub trait Session: Send {
    /// Channel this session is bound to
    fn channel(&self) -> ChannelId;

    /// Begin streaming `stream_locator` at `volume`
    ///
    /// `on_complete` must be fired once when the stream ends on its own or
    /// fails mid-stream. It must not be fired for streams ended through
    /// `stop`. A returned error means the stream never started and the
    /// handle is dropped.
    fn start(&mut self, stream_locator: &str, volume: f32, on_complete: CompletionHandle) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn resume(&mut self) -> Result<()>;

    /// Best-effort termination of the current stream
    fn stop(&mut self) -> Result<()>;

    /// Apply a new gain to the running stream
    fn set_volume(&mut self, level: f32) -> Result<()>;

    /// Tear down the connection
    fn release(self: Box<Self>);
}
