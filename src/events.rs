//! Event channel shared by the agent runtimes, the orchestrator, and the UI.
//!
//! All cross-component communication flows through one bounded mpsc channel of
//! [`Event`] values. The channel mixes critical events (`AgentAdded`) with
//! floodable ones (`AgentLine`), so [`EventSender::emit`] applies a
//! send-discipline table: `AgentAdded` blocks until there is room, everything
//! else is a non-blocking `try_send` that drops on a full channel.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

/// Bound on the shared event channel. Agents flood it with log lines; the UI
/// drains it at render cadence.
pub const EVENT_CHANNEL_CAPACITY: usize = 512;

/// Categorizes a parsed agent output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Assistant speech / narrative output.
    Say,
    /// Tool invocation or active work (editing, executing).
    Do,
    /// Observed tool output or captured stdout/stderr.
    See,
}

/// Everything the UI can learn about a running round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A child process started successfully. Emitted exactly once per agent,
    /// before any `AgentLine` for the same id.
    AgentAdded {
        id: String,
        name: String,
        kind: String,
        model: String,
        log_path: PathBuf,
        worktree: PathBuf,
    },

    /// The child was reaped. Emitted at most once; suppressed when the round
    /// context was cancelled first (the operator already knows).
    AgentStopped { id: String, exit_code: i32 },

    /// One categorized line of agent output.
    AgentLine {
        id: String,
        kind: MessageKind,
        line: String,
    },

    StatusMessage { text: String },

    PhaseChanged { phase: String },

    RemainingTime { remaining: Duration },

    TodoLoaded { content: String, path: PathBuf },
}

/// Cloneable sending half of the event channel, with the send discipline
/// baked in.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    /// Create the shared channel. The receiver goes to the UI consumer.
    pub fn channel() -> (EventSender, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (EventSender { tx }, rx)
    }

    /// Publish an event.
    ///
    /// Agent presence is critical: `AgentAdded` blocks rather than drop. All
    /// other events are dropped when the channel is full so that child
    /// progress is never back-pressured by a slow UI. A send on a closed
    /// channel (UI already gone) is ignored either way.
    pub async fn emit(&self, event: Event) {
        match event {
            Event::AgentAdded { .. } => {
                let _ = self.tx.send(event).await;
            }
            _ => {
                let _ = self.tx.try_send(event);
            }
        }
    }
}
