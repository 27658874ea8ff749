//! Shared helpers for integration tests: a recording mock transport and
//! track builders.

#![allow(dead_code)]

use async_trait::async_trait;
use guild_jukebox::{
    AudioTransport, ChannelId, CompletionHandle, EventReceiver, GuildId, PlaybackError,
    PlaybackEvent, Result, RoomStatus, Session, Track,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ===== Tracks =====

pub fn track(name: &str) -> Track {
    Track::new(
        name,
        180,
        format!("https://i.example.com/{}.jpg", name),
        format!("https://example.com/watch/{}", name),
    )
    .with_stream_locator(locator(name))
}

pub fn locator(name: &str) -> String {
    format!("https://cdn.example.com/{}.webm", name)
}

pub fn titles(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.title().to_string()).collect()
}

// ===== Mock transport =====

/// Call recorded by the mock transport, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Acquire { guild: GuildId, channel: ChannelId },
    Start { guild: GuildId, locator: String, volume: f32 },
    Pause { guild: GuildId },
    Resume { guild: GuildId },
    Stop { guild: GuildId },
    SetVolume { guild: GuildId, level: f32 },
    Release { guild: GuildId },
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    /// Completion handles of started streams, latest last
    handles: Vec<(GuildId, String, CompletionHandle)>,
    failing_locators: HashSet<String>,
    /// Guild connections held outside the controller (e.g. a stale voice link)
    foreign_channels: HashMap<GuildId, ChannelId>,
    live_sessions: HashMap<GuildId, usize>,
}

/// Transport that records every call and lets tests fire completions
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn AudioTransport> {
        Arc::new(self.clone())
    }

    /// Make every start of this locator fail synchronously
    pub fn fail_locator(&self, locator: impl Into<String>) {
        self.state.lock().unwrap().failing_locators.insert(locator.into());
    }

    /// Pretend the guild is already connected to another channel
    pub fn occupy(&self, guild: GuildId, channel: ChannelId) {
        self.state.lock().unwrap().foreign_channels.insert(guild, channel);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn started_locators(&self, guild: GuildId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Start { guild: g, locator, .. } if g == guild => Some(locator),
                _ => None,
            })
            .collect()
    }

    pub fn last_start_volume(&self, guild: GuildId) -> Option<f32> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::Start { guild: g, volume, .. } if g == guild => Some(volume),
            _ => None,
        })
    }

    /// Sessions acquired and not yet released for `guild`
    pub fn live_sessions(&self, guild: GuildId) -> usize {
        self.state
            .lock()
            .unwrap()
            .live_sessions
            .get(&guild)
            .copied()
            .unwrap_or(0)
    }

    /// Take the completion handle of the most recent stream of `guild`
    pub fn take_handle(&self, guild: GuildId) -> CompletionHandle {
        let mut state = self.state.lock().unwrap();
        let index = state
            .handles
            .iter()
            .rposition(|(g, _, _)| *g == guild)
            .expect("no stream started for guild");
        state.handles.remove(index).2
    }

    /// Take the completion handle of the most recent stream of `locator`
    pub fn take_handle_for(&self, guild: GuildId, locator: &str) -> CompletionHandle {
        let mut state = self.state.lock().unwrap();
        let index = state
            .handles
            .iter()
            .rposition(|(g, l, _)| *g == guild && l == locator)
            .expect("no stream started for locator");
        state.handles.remove(index).2
    }
}

#[async_trait]
impl AudioTransport for MockTransport {
    async fn acquire(&self, guild: GuildId, channel: ChannelId) -> Result<Box<dyn Session>> {
        let mut state = self.state.lock().unwrap();
        if let Some(&current) = state.foreign_channels.get(&guild) {
            if current != channel {
                return Err(PlaybackError::ChannelConflict {
                    current,
                    requested: channel,
                });
            }
        }
        state.calls.push(Call::Acquire { guild, channel });
        *state.live_sessions.entry(guild).or_insert(0) += 1;
        Ok(Box::new(MockSession {
            guild,
            channel,
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    guild: GuildId,
    channel: ChannelId,
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Session for MockSession {
    fn channel(&self) -> ChannelId {
        self.channel
    }

    fn start(&mut self, stream_locator: &str, volume: f32, on_complete: CompletionHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Start {
            guild: self.guild,
            locator: stream_locator.to_string(),
            volume,
        });
        if state.failing_locators.contains(stream_locator) {
            return Err(PlaybackError::TransportFailure(format!(
                "cannot open {}",
                stream_locator
            )));
        }
        state
            .handles
            .push((self.guild, stream_locator.to_string(), on_complete));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record(Call::Pause { guild: self.guild });
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.record(Call::Resume { guild: self.guild });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.record(Call::Stop { guild: self.guild });
        Ok(())
    }

    fn set_volume(&mut self, level: f32) -> Result<()> {
        self.record(Call::SetVolume {
            guild: self.guild,
            level,
        });
        Ok(())
    }

    fn release(self: Box<Self>) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Release { guild: self.guild });
        if let Some(live) = state.live_sessions.get_mut(&self.guild) {
            *live -= 1;
        }
    }
}

// ===== Assertions =====

/// Check the state-machine invariants on a status snapshot
pub fn assert_consistent(status: &RoomStatus) {
    let active = status.phase != guild_jukebox::Phase::Idle;
    assert_eq!(status.current.is_some(), active, "current vs phase: {:?}", status);
    assert_eq!(status.session.is_some(), active, "session vs phase: {:?}", status);
    assert!((0.0..=1.0).contains(&status.volume));
}

/// Wait for the next event matching `pred`, skipping others
pub async fn wait_for(
    events: &mut EventReceiver,
    pred: impl Fn(&PlaybackEvent) -> bool,
) -> PlaybackEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.expect("event channel failed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
