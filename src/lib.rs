//! Rust library for coordinating music playback in chat voice channels
//!
//! This library keeps one playback queue and state machine per guild (room)
//! and drives an external audio transport through it. It supports:
//!
//! - Start, pause, resume, stop, skip and skip-to-position
//! - Queue editing: enqueue, remove, clear and shuffle
//! - Per-guild volume that survives track changes and idle periods
//! - Automatic advance to the next queued track when a stream ends
//! - Bounded recovery from transport failures
//! - Real-time playback event subscriptions
//!
//! # Quick Start
//!
//! ```no_run
//! use guild_jukebox::{AudioTransport, ControllerRegistry, MetadataResolver, PlayOutcome};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     transport: Arc<dyn AudioTransport>,
//! #     resolver: &dyn MetadataResolver,
//! # ) -> guild_jukebox::Result<()> {
//! let registry = ControllerRegistry::new(transport);
//! let room = registry.room(1234);
//!
//! // Resolve a URL and play it (or queue it if something is already playing)
//! match room.play_query(resolver, 42, "https://youtu.be/dQw4w9WgXcQ").await? {
//!     PlayOutcome::Started => println!("Now playing"),
//!     PlayOutcome::Queued { position } => println!("Added at position {}", position),
//! }
//!
//! room.set_volume(0.3).await?;
//! room.skip().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Registry**: Lazily creates one controller per guild and routes completions
//! - **Room**: Cloneable handle that serializes calls onto a guild's controller
//! - **Controller**: Per-guild state machine (current track, session, queue, volume, epoch)
//! - **Queue**: Ordered pending tracks with positional removal and shuffle
//! - **Session / Transport**: Traits implemented by the audio backend
//! - **Resolver**: Trait implemented by the metadata lookup service
//! - **Events**: Broadcast notifications about playback changes
//!
//! # Stale completions
//!
//! Each stream start mints a new epoch, and the completion handle given to
//! the session carries it. `stop`, `skip` and `skip_to` move the epoch on
//! before tearing the stream down, so an end-of-stream report that races
//! with them is recognized as stale and dropped instead of advancing the
//! queue a second time.

mod completion;
mod config;
mod controller;
mod error;
mod events;
mod queue;
mod registry;
mod resolver;
mod room;
mod session;
mod types;

// Public exports
pub use completion::{Completion, CompletionHandle};
pub use config::PlayerConfig;
pub use error::{PlaybackError, Result};
pub use events::{EventReceiver, PlaybackEvent};
pub use queue::TrackQueue;
pub use registry::ControllerRegistry;
pub use resolver::{ensure_playable, MetadataResolver, TimedResolver};
pub use room::Room;
pub use session::{AudioTransport, Session};
pub use types::{
    ChannelId, CompletionOutcome, Epoch, GuildId, Phase, PlayOutcome, RoomStatus, SessionId,
    Skipped, Track, DEFAULT_VOLUME,
};
