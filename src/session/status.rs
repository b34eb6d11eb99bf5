//! Status indicator (the device's status LED)

use crate::session::state::ConversationState;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Shows the current conversation state to the user
pub trait StatusIndicator: Send + Sync {
    fn set_status(&self, state: ConversationState);
}

/// Indicator that logs status changes
#[derive(Default)]
pub struct LogIndicator;

impl StatusIndicator for LogIndicator {
    fn set_status(&self, state: ConversationState) {
        info!(status = %state, "Status changed");
    }
}

/// Indicator that writes the status word to a file
///
/// An LED daemon (or anything else) can watch the file.
pub struct FileIndicator {
    path: PathBuf,
}

impl FileIndicator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatusIndicator for FileIndicator {
    fn set_status(&self, state: ConversationState) {
        if let Err(e) = fs::write(&self.path, format!("{}\n", state)) {
            warn!(path = %self.path.display(), error = %e, "Failed to write status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_indicator_writes_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        let indicator = FileIndicator::new(&path);

        indicator.set_status(ConversationState::Listening);
        assert_eq!(fs::read_to_string(&path).unwrap(), "listening\n");

        indicator.set_status(ConversationState::Ready);
        assert_eq!(fs::read_to_string(&path).unwrap(), "ready\n");
    }

    #[test]
    fn test_file_indicator_bad_path_does_not_panic() {
        let indicator = FileIndicator::new("/nonexistent-dir/voicekit/status");
        indicator.set_status(ConversationState::Thinking);
    }
}
