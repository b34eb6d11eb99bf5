//! Assistant engine interface
//!
//! The conversational engine itself is external. The controller consumes its
//! event stream and issues two coarse control calls back to it.

pub mod events;

pub use events::{parse_line, ConsoleInput, EngineEvent};

use crate::{Result, VoiceKitError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

/// Control calls the controller makes into the assistant engine
pub trait AssistantEngine: Send + Sync {
    /// Ask the engine to start a new conversation turn
    fn start_conversation(&self) -> Result<()>;

    /// Ask the engine to end the current turn early
    fn stop_conversation(&self) -> Result<()>;
}

/// Loopback engine driven by console input
///
/// Answers control calls the way the real engine does: starting a
/// conversation produces `turn-started`, stopping one produces
/// `turn-finished`. The event channel is unbounded because control calls are
/// made from the thread that drains it.
pub struct ConsoleEngine {
    event_tx: Sender<EngineEvent>,
}

impl ConsoleEngine {
    /// Create the engine and the event stream it feeds
    pub fn new() -> (Self, Receiver<EngineEvent>) {
        let (event_tx, event_rx) = unbounded();
        (Self { event_tx }, event_rx)
    }

    /// Get a sender for injecting events into the stream
    pub fn event_sender(&self) -> Sender<EngineEvent> {
        self.event_tx.clone()
    }

    fn emit(&self, event: EngineEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| VoiceKitError::EngineError(format!("Event stream closed: {}", e)))
    }
}

impl AssistantEngine for ConsoleEngine {
    fn start_conversation(&self) -> Result<()> {
        debug!("Engine: start conversation");
        self.emit(EngineEvent::TurnStarted)
    }

    fn stop_conversation(&self) -> Result<()> {
        debug!("Engine: stop conversation");
        self.emit(EngineEvent::TurnFinished)
    }
}
