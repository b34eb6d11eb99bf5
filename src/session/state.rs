//! Conversation state and the transition table
//!
//! `transition` is total over (state, event): every pair yields a next state
//! and a list of effects, or is marked ignored with a reason. It performs no
//! side effects itself; the controller applies the effects.

use crate::engine::EngineEvent;
use std::fmt;

/// Exit code used when the engine reports a fatal error
pub const FATAL_EXIT_CODE: i32 = 1;

/// Assistant lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversationState {
    /// Engine is still starting
    #[default]
    Starting,
    /// Idle, a conversation may be started
    Ready,
    /// A turn is open and the engine is capturing speech
    Listening,
    /// The utterance ended and the engine is working on a response
    Thinking,
}

impl ConversationState {
    /// Check if a turn is open
    pub fn is_in_turn(&self) -> bool {
        matches!(
            self,
            ConversationState::Listening | ConversationState::Thinking
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Starting => "starting",
            ConversationState::Ready => "ready",
            ConversationState::Listening => "listening",
            ConversationState::Thinking => "thinking",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A side effect requested by a transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Register the button handler (at most once per process)
    RegisterButton,
    /// Allow a new conversation to be started
    EnableConversation,
    /// Forbid starting a conversation
    DisableConversation,
    /// Forget a button-requested start the engine has not answered yet
    ClearPendingStart,
    /// Stop the running media job, if any
    CancelMediaJob,
    /// Interpret recognized text and dispatch its action
    HandleUtterance(String),
    /// Terminate the process with this code
    Exit(i32),
}

/// Result of applying an event to a state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: ConversationState,
    pub effects: Vec<Effect>,
    /// Set when the event was not applicable in this state
    pub ignored: Option<&'static str>,
}

impl Transition {
    fn to(next: ConversationState, effects: Vec<Effect>) -> Self {
        Self {
            next,
            effects,
            ignored: None,
        }
    }

    fn ignored(state: ConversationState, reason: &'static str) -> Self {
        Self {
            next: state,
            effects: Vec::new(),
            ignored: Some(reason),
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored.is_some()
    }
}

/// The transition function
pub fn transition(state: ConversationState, event: &EngineEvent) -> Transition {
    use ConversationState::*;

    match (state, event) {
        // Fatal errors end the process from any state
        (_, e) if e.is_fatal() => Transition::to(
            state,
            vec![Effect::CancelMediaJob, Effect::Exit(FATAL_EXIT_CODE)],
        ),
        (_, EngineEvent::Error { is_fatal: false }) => {
            Transition::ignored(state, "non-fatal engine error")
        }

        (Starting, EngineEvent::Ready) => Transition::to(
            Ready,
            vec![Effect::EnableConversation, Effect::RegisterButton],
        ),
        (_, EngineEvent::Ready) => Transition::ignored(state, "engine already ready"),
        (Starting, _) => Transition::ignored(state, "event before engine ready"),

        (Ready, EngineEvent::TurnStarted) => Transition::to(
            Listening,
            vec![Effect::DisableConversation, Effect::ClearPendingStart],
        ),

        (Listening, EngineEvent::EndOfUtterance) => Transition::to(Thinking, Vec::new()),

        (Listening | Thinking, e) if e.is_terminating() => Transition::to(
            Ready,
            vec![Effect::EnableConversation, Effect::CancelMediaJob],
        ),
        // The engine ended a requested turn without ever starting it
        (Ready, e) if e.is_terminating() => {
            Transition::to(Ready, vec![Effect::ClearPendingStart])
        }

        (Listening | Thinking, EngineEvent::SpeechRecognized { text: Some(text) })
            if !text.trim().is_empty() =>
        {
            Transition::to(state, vec![Effect::HandleUtterance(text.clone())])
        }
        (_, EngineEvent::SpeechRecognized { .. }) => {
            Transition::ignored(state, "no recognized text in an open turn")
        }

        (_, EngineEvent::Other(_)) => Transition::ignored(state, "unhandled event type"),

        _ => Transition::ignored(state, "event not expected in this state"),
    }
}
