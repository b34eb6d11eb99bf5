//! Session state machine and the controller that drives it

pub mod controller;
pub mod state;
pub mod status;

pub use controller::{
    EventOutcome, PressOutcome, SessionController, SessionControllerBuilder, SessionSnapshot,
};
pub use state::{transition, ConversationState, Effect, Transition, FATAL_EXIT_CODE};
pub use status::{FileIndicator, LogIndicator, StatusIndicator};
