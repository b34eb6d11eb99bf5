//! Session controller
//!
//! Single source of truth for the conversation state, the conversation-start
//! permission and the media job handle. Two threads call in: the engine
//! event thread (`handle_event`) and the button thread (`on_button_pressed`).
//! All shared state lives behind one mutex and is only changed through
//! whole-transition methods, so a decision and the action depending on it
//! are always taken under the same lock.
//!
//! Blocking work (announcements, news retrieval) runs outside the lock so a
//! button press is never stuck behind speech synthesis. Engine control calls
//! are made while holding the lock and must not call back into the
//! controller.

use crate::audio::{MediaConfig, MediaJobSupervisor};
use crate::content::{format_digest, local_ip, IpResolver, NewsClient};
use crate::engine::{AssistantEngine, EngineEvent};
use crate::input::ButtonInput;
use crate::integration::config::ControllerConfig;
use crate::session::state::{transition, ConversationState, Effect};
use crate::session::status::{FileIndicator, LogIndicator, StatusIndicator};
use crate::speech::{
    Action, AnnouncementSink, Announcer, CommandInterpreter, RecognizedUtterance,
};
use crate::{Result, VoiceKitError};
use parking_lot::Mutex;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What the engine thread should do after an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// Keep processing events
    Continue,
    /// Stop processing and exit the process with this code
    Exit(i32),
}

/// What a button press did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PressOutcome {
    pub started_conversation: bool,
    pub cancelled_media_job: bool,
}

/// Point-in-time view of the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConversationState,
    pub can_start_conversation: bool,
    /// A press asked the engine to start and no turn has started yet
    pub start_pending: bool,
    pub button_registered: bool,
    pub media_job: Option<Uuid>,
    pub media_pid: Option<u32>,
}

/// State guarded by the controller's mutex
struct Session {
    state: ConversationState,
    can_start_conversation: bool,
    start_pending: bool,
    button_registered: bool,
    media: MediaJobSupervisor,
}

/// The session state machine and its collaborators
pub struct SessionController {
    session: Mutex<Session>,
    engine: Arc<dyn AssistantEngine>,
    button: Arc<dyn ButtonInput>,
    interpreter: CommandInterpreter,
    media_config: MediaConfig,
    announcer: AnnouncementSink,
    news: NewsClient,
    runtime: Runtime,
    status: Box<dyn StatusIndicator>,
    resolve_ip: IpResolver,
}

impl SessionController {
    /// Start building a controller around an engine and a button
    pub fn builder(
        engine: Arc<dyn AssistantEngine>,
        button: Arc<dyn ButtonInput>,
    ) -> SessionControllerBuilder {
        SessionControllerBuilder::new(engine, button)
    }

    // === Engine thread entry point ===

    /// Apply one engine event
    pub fn handle_event(self: &Arc<Self>, event: EngineEvent) -> EventOutcome {
        let (previous, next, deferred) = {
            let mut session = self.session.lock();
            let t = transition(session.state, &event);

            if let Some(reason) = t.ignored {
                let state = session.state;
                match event {
                    EngineEvent::Other(_) => {
                        debug!(event = %event, %state, "Ignoring event: {}", reason)
                    }
                    _ => warn!(event = %event, %state, "Ignoring event: {}", reason),
                }
                return EventOutcome::Continue;
            }

            let previous = session.state;
            session.state = t.next;
            if previous != t.next {
                debug!(event = %event, "State {} -> {}", previous, t.next);
            }

            let mut deferred = Vec::new();
            for effect in t.effects {
                match effect {
                    Effect::EnableConversation => session.can_start_conversation = true,
                    Effect::DisableConversation => session.can_start_conversation = false,
                    Effect::ClearPendingStart => {
                        if session.start_pending {
                            debug!("Pending conversation start answered by {}", event.name());
                        }
                        session.start_pending = false;
                    }
                    Effect::CancelMediaJob => {
                        if session.media.cancel() {
                            info!("Media job cancelled by {}", event.name());
                        }
                    }
                    Effect::RegisterButton => {
                        if !session.button_registered {
                            session.button_registered = true;
                            deferred.push(Effect::RegisterButton);
                        }
                    }
                    other => deferred.push(other),
                }
            }

            (previous, t.next, deferred)
        };

        if previous != next {
            self.status.set_status(next);
            if previous == ConversationState::Starting && std::io::stdout().is_terminal() {
                println!("Say the hotword or press the button, then speak. Press Ctrl+C to quit...");
            }
        }

        for effect in deferred {
            match effect {
                Effect::RegisterButton => self.register_button(),
                Effect::HandleUtterance(text) => self.handle_utterance(&text),
                Effect::Exit(code) => {
                    error!(code, "Fatal engine error, exiting");
                    return EventOutcome::Exit(code);
                }
                _ => {}
            }
        }

        EventOutcome::Continue
    }

    fn register_button(self: &Arc<Self>) {
        let controller = Arc::downgrade(self);
        let result = self.button.on_press(Box::new(move || {
            if let Some(controller) = controller.upgrade() {
                controller.on_button_pressed();
            }
        }));

        if let Err(e) = result {
            error!(error = %e, "Failed to register button handler");
        }
    }

    /// Interpret recognized text and run the matching local action
    fn handle_utterance(&self, text: &str) {
        let utterance = RecognizedUtterance::new(text);
        info!("You said: {}", utterance.raw);

        let action = self.interpreter.interpret(&utterance);
        if !action.is_known() {
            debug!("Not a local command, leaving the turn to the assistant");
            return;
        }

        // End the turn first so the engine stops expecting speech while the
        // local action runs.
        if let Err(e) = self.engine.stop_conversation() {
            warn!(error = %e, "Failed to stop conversation");
        }

        info!(?action, "Dispatching action");
        if let Err(e) = self.dispatch(&action) {
            error!(?action, error = %e, "Action failed: {}", e.user_message());
            self.abort_turn();
        }
    }

    /// Fall back to Ready after a failed action
    fn abort_turn(&self) {
        let returned = {
            let mut session = self.session.lock();
            if session.state.is_in_turn() {
                session.state = ConversationState::Ready;
                session.can_start_conversation = true;
                session.start_pending = false;
                true
            } else {
                false
            }
        };

        if returned {
            self.status.set_status(ConversationState::Ready);
        }
    }

    /// Run an action
    ///
    /// Announcements block until spoken. Stream playback starts a media job
    /// (replacing any running one) and returns immediately.
    pub fn dispatch(&self, action: &Action) -> Result<()> {
        match action {
            Action::AnnounceIp => {
                let ip = (self.resolve_ip)()?;
                self.announcer.say(&format!("My IP address is {}", ip))
            }
            Action::PlayStream(url) => self.play_stream(url).map(|_| ()),
            Action::PlayNewsDigest => {
                let headlines = self.runtime.block_on(self.news.fetch_headlines())?;
                let digest = format_digest(&headlines).ok_or_else(|| {
                    VoiceKitError::ContentError("News feed has no headlines".into())
                })?;
                self.announcer.say(&digest)
            }
            Action::Unknown => Ok(()),
        }
    }

    /// Start playing a stream, replacing any running job
    ///
    /// Returns the player's pid.
    pub fn play_stream(&self, url: &str) -> Result<u32> {
        let command = self.media_config.stream_command(url);
        let mut session = self.session.lock();
        session.media.start(command)?;
        session
            .media
            .current_pid()
            .ok_or_else(|| VoiceKitError::MediaJobError("Media job vanished after start".into()))
    }

    // === Button thread entry point ===

    /// Handle a button press
    ///
    /// Starts a conversation if one may be started, and always stops any
    /// running media job. Until the engine answers with turn-started (or ends
    /// the turn), further presses do not ask for another conversation.
    pub fn on_button_pressed(&self) -> PressOutcome {
        let mut session = self.session.lock();
        let mut outcome = PressOutcome::default();

        if session.can_start_conversation && !session.start_pending {
            match self.engine.start_conversation() {
                Ok(()) => {
                    session.start_pending = true;
                    outcome.started_conversation = true;
                }
                Err(e) => warn!(error = %e, "Failed to start conversation"),
            }
        } else if session.start_pending {
            debug!("Conversation start already requested");
        } else {
            debug!(state = %session.state, "Button press cannot start a conversation now");
        }

        if session.media.cancel() {
            info!("Media job cancelled by button");
            outcome.cancelled_media_job = true;
        }

        outcome
    }

    // === Shutdown ===

    /// Stop any running media job
    pub fn shutdown(&self) {
        if self.session.lock().media.cancel() {
            info!("Media job cancelled on shutdown");
        }
    }

    // === Read access ===

    pub fn state(&self) -> ConversationState {
        self.session.lock().state
    }

    pub fn can_start_conversation(&self) -> bool {
        self.session.lock().can_start_conversation
    }

    /// Whether a media job is running, reaping it if it exited
    pub fn has_media_job(&self) -> bool {
        self.session.lock().media.is_alive()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut session = self.session.lock();
        let alive = session.media.is_alive();
        SessionSnapshot {
            state: session.state,
            can_start_conversation: session.can_start_conversation,
            start_pending: session.start_pending,
            button_registered: session.button_registered,
            media_job: if alive { session.media.current_id() } else { None },
            media_pid: if alive { session.media.current_pid() } else { None },
        }
    }
}

/// Builder for creating a session controller
pub struct SessionControllerBuilder {
    engine: Arc<dyn AssistantEngine>,
    button: Arc<dyn ButtonInput>,
    config: ControllerConfig,
    announcer: Option<Box<dyn Announcer>>,
    status: Option<Box<dyn StatusIndicator>>,
    resolve_ip: Option<IpResolver>,
}

impl SessionControllerBuilder {
    pub fn new(engine: Arc<dyn AssistantEngine>, button: Arc<dyn ButtonInput>) -> Self {
        Self {
            engine,
            button,
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

    /// Build the controller
    pub fn build(self) -> Result<Arc<SessionController>> {
        self.config.validate()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let news = NewsClient::new(self.config.news.clone())?;

        let announcer = match self.announcer {
            Some(backend) => AnnouncementSink::new(backend, self.config.announce.default_voice()),
            None => AnnouncementSink::from_config(&self.config.announce),
        };
        let resolve_ip: IpResolver = match self.resolve_ip {
            Some(resolve_ip) => resolve_ip,
            None => Box::new(local_ip),
        };

        let status: Box<dyn StatusIndicator> = match (self.status, &self.config.status_file) {
            (Some(status), _) => status,
            (None, Some(path)) => Box::new(FileIndicator::new(path.clone())),
            (None, None) => Box::new(LogIndicator),
        };

        let session = Session {
            state: ConversationState::Starting,
            can_start_conversation: false,
            start_pending: false,
            button_registered: false,
            media: MediaJobSupervisor::new(self.config.media.terminate_timeout()),
        };

        Ok(Arc::new(SessionController {
            session: Mutex::new(session),
            engine: self.engine,
            button: self.button,
            interpreter: CommandInterpreter::new(self.config.media.stream_url.clone()),
            media_config: self.config.media,
            announcer,
            news,
            runtime,
            status,
            resolve_ip,
        }))
    }
}
