//! Interactive console driving one guild against a simulated transport
//!
//! Usage: `cargo run --example console [config.json]`
//!
//! Tracks "play" in accelerated time (one real second per simulated ten)
//! and report completion the way a real audio backend would.

use async_trait::async_trait;
use guild_jukebox::{
    AudioTransport, ChannelId, CompletionHandle, ControllerRegistry, GuildId, MetadataResolver,
    PlayOutcome, PlaybackError, PlaybackEvent, PlayerConfig, Result, Room, Session,
    TimedResolver, Track,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

const GUILD: GuildId = 1;
const CHANNEL: ChannelId = 100;
const TICK: Duration = Duration::from_millis(100);

// ===== Simulated backend =====

struct SimTransport;

#[async_trait]
impl AudioTransport for SimTransport {
    async fn acquire(&self, guild: GuildId, channel: ChannelId) -> Result<Box<dyn Session>> {
        tracing::info!("Joining channel {} in guild {}", channel, guild);
        Ok(Box::new(SimSession {
            channel,
            paused: Arc::new(AtomicBool::new(false)),
            player: None,
        }))
    }
}

struct SimSession {
    channel: ChannelId,
    paused: Arc<AtomicBool>,
    player: Option<JoinHandle<()>>,
}

impl SimSession {
    fn abort_player(&mut self) {
        if let Some(player) = self.player.take() {
            player.abort();
        }
    }
}

/// Parse the simulated length out of `sim://<slug>?secs=<n>`
fn simulated_length(locator: &str) -> Option<u64> {
    let secs = locator.strip_prefix("sim://")?.split("?secs=").nth(1)?;
    secs.parse().ok()
}

impl Session for SimSession {
    fn channel(&self) -> ChannelId {
        self.channel
    }

    fn start(&mut self, stream_locator: &str, _volume: f32, on_complete: CompletionHandle) -> Result<()> {
        let length = simulated_length(stream_locator).ok_or_else(|| {
            PlaybackError::TransportFailure(format!("cannot open {}", stream_locator))
        })?;

        self.abort_player();
        self.paused.store(false, Ordering::SeqCst);
        let paused = self.paused.clone();
        let ticks = length;

        self.player = Some(tokio::spawn(async move {
            let mut played = 0;
            while played < ticks {
                tokio::time::sleep(TICK).await;
                if !paused.load(Ordering::SeqCst) {
                    played += 1;
                }
            }
            on_complete.finished();
        }));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.abort_player();
        Ok(())
    }

    fn set_volume(&mut self, level: f32) -> Result<()> {
        tracing::debug!("Mixer volume now {:.2}", level);
        Ok(())
    }

    fn release(mut self: Box<Self>) {
        self.abort_player();
        tracing::info!("Left channel {}", self.channel);
    }
}

/// Small fixed catalogue searched by title
struct Catalogue {
    tracks: Vec<Track>,
}

impl Catalogue {
    fn new() -> Self {
        let entry = |title: &str, secs: u64| {
            let slug = title.to_lowercase().replace(' ', "-");
            Track::new(
                title,
                secs,
                format!("https://i.example.com/{}.jpg", slug),
                format!("https://example.com/watch/{}", slug),
            )
            .with_stream_locator(format!("sim://{}?secs={}", slug, secs))
        };
        let broken = Track::new("Broken Record", 90, "", "https://example.com/watch/broken")
            .with_stream_locator("sim://broken");

        Self {
            tracks: vec![
                entry("Morning Coffee", 45),
                entry("Rainy Window", 60),
                entry("Night Drive", 80),
                entry("Last Train Home", 50),
                broken,
            ],
        }
    }
}

#[async_trait]
impl MetadataResolver for Catalogue {
    async fn resolve(&self, query: &str) -> Result<Track> {
        let needle = query.to_lowercase();
        self.tracks
            .iter()
            .find(|t| t.title().to_lowercase().contains(&needle) || t.webpage_url() == query)
            .cloned()
            .ok_or_else(|| PlaybackError::resolution(query, "no results"))
    }
}

// ===== Command layer =====

fn print_help() {
    println!("Commands:");
    println!("  play <query>   queue or play a track");
    println!("  pause | resume | stop | skip");
    println!("  skipto <n>     jump to queue position n");
    println!("  remove <n>     remove queue position n");
    println!("  shuffle | clear | queue | np");
    println!("  volume <0-100> set the volume");
    println!("  quit");
}

async fn print_queue(room: &Room) {
    let status = room.status().await;
    match &status.current {
        Some(track) => println!("Now playing: {} [{}] ({})", track.title(), track.display_duration(), status.phase),
        None => println!("Nothing playing"),
    }
    if status.queue.is_empty() {
        println!("Queue is empty");
    }
    for (i, track) in status.queue.iter().enumerate() {
        println!("  {}. {} [{}]", i + 1, track.title(), track.display_duration());
    }
}

fn parse_position(arg: Option<&str>) -> Option<usize> {
    arg.and_then(|a| a.parse().ok())
}

/// Run one command; returns false when the console should exit
async fn handle_command(room: &Room, resolver: &dyn MetadataResolver, line: &str) -> Result<bool> {
    let mut parts = line.trim().splitn(2, ' ');
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim);

    match command {
        "" => {}
        "help" => print_help(),
        "play" => match arg {
            Some(query) => match room.play_query(resolver, CHANNEL, query).await? {
                PlayOutcome::Started => println!("Now playing"),
                PlayOutcome::Queued { position } => println!("Added to queue at position {}", position),
            },
            None => println!("Usage: play <query>"),
        },
        "pause" => room.pause().await?,
        "resume" => room.resume().await?,
        "stop" => room.stop().await?,
        "skip" => {
            let skipped = room.skip().await?;
            println!("Skipped {}", skipped.skipped.title());
        }
        "skipto" => match parse_position(arg) {
            Some(n) => {
                let skipped = room.skip_to(n).await?;
                println!("Skipped {} and {} queued track(s)", skipped.skipped.title(), skipped.discarded);
            }
            None => println!("Usage: skipto <n>"),
        },
        "remove" => match parse_position(arg) {
            Some(n) => println!("Removed {}", room.remove_at(n).await?.title()),
            None => println!("Usage: remove <n>"),
        },
        "shuffle" => println!("Shuffled {} track(s)", room.shuffle().await),
        "clear" => println!("Cleared {} track(s)", room.clear_queue().await),
        "queue" | "np" => print_queue(room).await,
        "volume" => match arg.and_then(|a| a.parse::<u8>().ok()).filter(|v| *v <= 100) {
            Some(percent) => {
                room.set_volume(f32::from(percent) / 100.0).await?;
                println!("Volume set to {}%", percent);
            }
            None => println!("Volume is {:.0}%", room.volume().await * 100.0),
        },
        "quit" | "exit" => return Ok(false),
        other => println!("Unknown command '{}', try 'help'", other),
    }
    Ok(true)
}

fn describe(event: &PlaybackEvent) -> String {
    match event {
        PlaybackEvent::TrackStarted { track, .. } => format!("Now playing: {}", track.title()),
        PlaybackEvent::TrackFailed { track, reason, .. } => {
            format!("Could not play {}: {}", track.title(), reason)
        }
        PlaybackEvent::AutoAdvanceHalted { remaining, .. } => {
            format!("Playback halted after repeated errors, {} track(s) still queued", remaining)
        }
        PlaybackEvent::QueueFinished { .. } => "Queue finished".to_string(),
        PlaybackEvent::Stopped { .. } => "Stopped and cleared the queue".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PlayerConfig::from_file(path)?,
        None => PlayerConfig::default(),
    };
    config.validate()?;

    let resolver = TimedResolver::new(Catalogue::new(), config.resolve_timeout());
    let registry = ControllerRegistry::with_config(Arc::new(SimTransport), config);
    let room = registry.room(GUILD);

    let mut events = registry.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("* {}", describe(&event));
        }
    });

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match handle_command(&room, &resolver, &line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("Error: {}", e),
        }
    }

    registry.shutdown().await;
    Ok(())
}
