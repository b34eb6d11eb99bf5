//! Speech-facing modules
//!
//! This module provides:
//! - Command interpretation of recognized utterances
//! - Spoken announcements through a synthesis backend

pub mod announce;
pub mod commands;

// Re-export commonly used types
pub use announce::{
    AnnounceConfig, AnnouncementSink, Announcer, CommandAnnouncer, LogAnnouncer, VoiceProfile,
};
pub use commands::{Action, CommandInterpreter, RecognizedUtterance, DEFAULT_STREAM_URL};
