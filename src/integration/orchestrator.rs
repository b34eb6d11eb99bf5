//! Orchestrator for the controller process
//!
//! Wires the trigger sources to the session controller:
//! console input -> {engine event stream, button} -> SessionController

use crate::content::IpResolver;
use crate::engine::{parse_line, ConsoleEngine, EngineEvent};
use crate::input::ChannelButton;
use crate::integration::config::ControllerConfig;
use crate::session::{EventOutcome, SessionController, StatusIndicator};
use crate::speech::Announcer;
use crate::utils::TriggerChannels;
use crate::Result;
use crossbeam_channel::{select, Receiver};
use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Exit code when the event stream ends normally
pub const NORMAL_EXIT_CODE: i32 = 0;

/// Owns the engine event stream and the controller consuming it
pub struct Orchestrator {
    controller: Arc<SessionController>,
    events: Receiver<EngineEvent>,
    input_closed: Receiver<()>,
}

impl Orchestrator {
    /// Get the controller
    pub fn controller(&self) -> Arc<SessionController> {
        Arc::clone(&self.controller)
    }

    /// Start the engine event thread
    ///
    /// The thread runs until a fatal error or until the input closes and
    /// every pending event has been handled. It returns the process exit
    /// code.
    pub fn start(self) -> Result<JoinHandle<i32>> {
        let handle = thread::Builder::new()
            .name("engine-events".into())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    fn run(self) -> i32 {
        info!("Event loop started");

        loop {
            select! {
                recv(self.events) -> msg => match msg {
                    Ok(event) => {
                        if let EventOutcome::Exit(code) = self.controller.handle_event(event) {
                            return code;
                        }
                    }
                    Err(_) => break,
                },
                recv(self.input_closed) -> _ => {
                    debug!("Input closed, draining pending events");
                    while let Ok(event) = self.events.try_recv() {
                        if let EventOutcome::Exit(code) = self.controller.handle_event(event) {
                            return code;
                        }
                    }
                    break;
                }
            }
        }

        self.controller.shutdown();
        info!("Event stream ended");
        NORMAL_EXIT_CODE
    }
}

/// Read console lines and route them to the trigger channels
///
/// Lines that fail to parse are logged and skipped. The channels are dropped
/// when the reader reaches end of input.
pub fn spawn_console_reader<R>(reader: R, channels: TriggerChannels) -> Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    let handle = thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to read console input");
                        break;
                    }
                };

                match parse_line(&line) {
                    Ok(Some(input)) => {
                        if let Err(e) = channels.send(input) {
                            warn!(error = %e, "Dropping console input");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, line = %line, "Skipping console line"),
                }
            }
            debug!("Console input closed");
        })?;
    Ok(handle)
}

/// Builder for creating an orchestrator
pub struct OrchestratorBuilder {
    config: ControllerConfig,
    announcer: Option<Box<dyn Announcer>>,
    status: Option<Box<dyn StatusIndicator>>,
    resolve_ip: Option<IpResolver>,
}

impl OrchestratorBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ControllerConfig::default(),
            announcer: None,
            status: None,
            resolve_ip: None,
        }
    }

    /// Set the complete configuration
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the configured announcement backend
    pub fn with_announcer(mut self, announcer: Box<dyn Announcer>) -> Self {
        self.announcer = Some(announcer);
        self
    }

    /// Replace the status indicator
    pub fn with_status(mut self, status: Box<dyn StatusIndicator>) -> Self {
        self.status = Some(status);
        self
    }

    /// Replace the local address lookup used by AnnounceIp
    pub fn with_ip_resolver(mut self, resolve_ip: IpResolver) -> Self {
        self.resolve_ip = Some(resolve_ip);
        self
    }

    /// Build the orchestrator around the console engine and a channel button
    pub fn build(self) -> Result<(Orchestrator, TriggerChannels)> {
        let (engine, events) = ConsoleEngine::new();
        let event_tx = engine.event_sender();
        let (button, press_tx) = ChannelButton::new();

        let mut builder = SessionController::builder(Arc::new(engine), Arc::new(button))
            .with_config(self.config);
        if let Some(announcer) = self.announcer {
            builder = builder.with_announcer(announcer);
        }
        if let Some(status) = self.status {
            builder = builder.with_status(status);
        }
        if let Some(resolve_ip) = self.resolve_ip {
            builder = builder.with_ip_resolver(resolve_ip);
        }
        let controller = builder.build()?;

        let (channels, input_closed) = TriggerChannels::new(event_tx, press_tx);
        let orchestrator = Orchestrator {
            controller,
            events,
            input_closed,
        };

        Ok((orchestrator, channels))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ConversationState, LogIndicator};
    use crate::speech::LogAnnouncer;
    use std::io::Cursor;

    fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
            .with_config(
                ControllerConfig::default()
                    .with_player("sleep", vec!["30".into()])
                    .without_startup_delay(),
            )
            .with_announcer(Box::new(LogAnnouncer))
            .with_status(Box::new(LogIndicator))
    }

    fn run_script(script: &str) -> (i32, Arc<SessionController>) {
        let (orchestrator, channels) = builder().build().unwrap();
        let controller = orchestrator.controller();
        let events = orchestrator.start().unwrap();

        let reader = spawn_console_reader(Cursor::new(script.to_string()), channels).unwrap();
        reader.join().unwrap();
        (events.join().unwrap(), controller)
    }

    #[test]
    fn test_stream_end_exits_normally() {
        let (code, controller) = run_script("ready\nturn-started\nend-of-utterance\nno-response\n");
        assert_eq!(code, NORMAL_EXIT_CODE);
        assert_eq!(controller.state(), ConversationState::Ready);
        assert!(controller.can_start_conversation());
    }

    #[test]
    fn test_fatal_error_exit_code() {
        let (code, _) = run_script("ready\nerror fatal\nturn-started\n");
        assert_eq!(code, 1);
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let (code, controller) = run_script("# comment\n{not json\n\nready\n");
        assert_eq!(code, NORMAL_EXIT_CODE);
        assert_eq!(controller.state(), ConversationState::Ready);
    }
}
