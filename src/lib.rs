pub mod audio;
pub mod content;
pub mod engine;
pub mod input;
pub mod integration;
pub mod session;
pub mod speech;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum VoiceKitError {
    #[error("Media job error: {0}")]
    MediaJobError(String),

    #[error("Announcement error: {0}")]
    AnnouncementError(String),

    #[error("Content retrieval error: {0}")]
    ContentError(String),

    #[error("Engine error: {0}")]
    EngineError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<std::io::Error> for VoiceKitError {
    fn from(e: std::io::Error) -> Self {
        VoiceKitError::IOError(e.to_string())
    }
}

impl VoiceKitError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // A failed player launch only aborts the current action
            VoiceKitError::MediaJobError(_) => true,
            VoiceKitError::AnnouncementError(_) => true,
            // Remote content is best effort
            VoiceKitError::ContentError(_) => true,
            VoiceKitError::EngineError(_) => false,
            VoiceKitError::ConfigError(_) => false,
            VoiceKitError::ChannelError(_) => false,
            VoiceKitError::IOError(_) => false,
            VoiceKitError::ParseError(_) => true,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            VoiceKitError::MediaJobError(_) => {
                "Playback could not be started. Check that the player is installed.".to_string()
            }
            VoiceKitError::AnnouncementError(_) => {
                "Speech synthesis failed. Check the speaker and the synthesis program.".to_string()
            }
            VoiceKitError::ContentError(_) => {
                "Could not fetch content. Please try again later.".to_string()
            }
            VoiceKitError::EngineError(_) => {
                "The assistant engine reported an error. Please restart.".to_string()
            }
            VoiceKitError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            VoiceKitError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            VoiceKitError::IOError(_) => "File system error occurred.".to_string(),
            VoiceKitError::ParseError(_) => "Input could not be understood.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VoiceKitError>;
