use crate::room::Room;
use crate::types::{CompletionOutcome, Epoch, GuildId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Epoch-tagged end-of-stream message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub guild: GuildId,
    pub epoch: Epoch,
    pub outcome: CompletionOutcome,
}

/// One-shot notifier handed to a session when a stream starts
///
/// The transport fires it from whatever context it runs on; the message is
/// marshaled back onto the guild's lock before it can touch any state.
#[derive(Debug)]
pub struct CompletionHandle {
    guild: GuildId,
    epoch: Epoch,
    tx: mpsc::UnboundedSender<Completion>,
}

impl CompletionHandle {
    pub(crate) fn new(guild: GuildId, epoch: Epoch, tx: mpsc::UnboundedSender<Completion>) -> Self {
        Self { guild, epoch, tx }
    }

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    /// Epoch of the stream this handle belongs to
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Report a natural end of stream
    pub fn finished(self) {
        self.send(CompletionOutcome::Finished);
    }

    /// Report a transport failure for this stream
    pub fn failed(self, reason: impl Into<String>) {
        self.send(CompletionOutcome::Failed(reason.into()));
    }

    fn send(self, outcome: CompletionOutcome) {
        let completion = Completion {
            guild: self.guild,
            epoch: self.epoch,
            outcome,
        };
        if self.tx.send(completion).is_err() {
            tracing::debug!("Completion for guild {} dropped: registry is gone", self.guild);
        }
    }
}

/// Receive completions and route each one to its guild
///
/// Every message is handled on its own task so a busy guild never delays
/// completions for another.
pub(crate) async fn dispatch_completions(
    mut rx: mpsc::UnboundedReceiver<Completion>,
    rooms: Arc<Mutex<HashMap<GuildId, Room>>>,
) {
    while let Some(completion) = rx.recv().await {
        let room = {
            let rooms = rooms.lock().unwrap_or_else(|e| e.into_inner());
            rooms.get(&completion.guild).cloned()
        };

        match room {
            Some(room) => {
                tokio::spawn(async move {
                    room.on_track_complete(completion.epoch, completion.outcome).await;
                });
            }
            None => {
                tracing::error!(
                    "Completion for unknown guild {} (epoch {})",
                    completion.guild,
                    completion.epoch
                );
            }
        }
    }

    tracing::debug!("Completion channel closed");
}
