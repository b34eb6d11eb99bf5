//! Voice command interpretation
//!
//! Maps a recognized utterance to a symbolic [`Action`]. Matching is exact
//! against a small fixed phrase set after normalization (trimmed,
//! lower-cased). Anything else is [`Action::Unknown`], which callers treat as
//! "let the assistant handle it".
//!
//! | Phrase | Action |
//! |--------|--------|
//! | "ip address" | `AnnounceIp` |
//! | "play youtube" | `PlayStream(url)` |
//! | "show me some news" | `PlayNewsDigest` |

/// Stream played by "play youtube" unless configured otherwise
pub const DEFAULT_STREAM_URL: &str = "https://www.youtube.com/watch?v=QYT8WYdPJYo";

const PHRASE_IP: &str = "ip address";
const PHRASE_STREAM: &str = "play youtube";
const PHRASE_NEWS: &str = "show me some news";

/// A command derived from recognized speech
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Speak the device's IP address
    AnnounceIp,
    /// Play an audio stream in the background
    PlayStream(String),
    /// Fetch headlines and read them out
    PlayNewsDigest,
    /// Not a local command
    Unknown,
}

impl Action {
    /// Whether the action is handled locally
    pub fn is_known(&self) -> bool {
        !matches!(self, Action::Unknown)
    }
}

/// Text from the recognizer, raw and normalized
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognizedUtterance {
    pub raw: String,
    pub normalized: String,
}

impl RecognizedUtterance {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = raw.trim().to_lowercase();
        Self { raw, normalized }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Maps utterances to actions
#[derive(Clone, Debug)]
pub struct CommandInterpreter {
    stream_url: String,
}

impl CommandInterpreter {
    pub fn new(stream_url: impl Into<String>) -> Self {
        Self {
            stream_url: stream_url.into(),
        }
    }

    /// Look up the action for an utterance
    pub fn interpret(&self, utterance: &RecognizedUtterance) -> Action {
        match utterance.normalized.as_str() {
            PHRASE_IP => Action::AnnounceIp,
            PHRASE_STREAM => Action::PlayStream(self.stream_url.clone()),
            PHRASE_NEWS => Action::PlayNewsDigest,
            _ => Action::Unknown,
        }
    }

    /// Convenience for raw text
    pub fn interpret_text(&self, text: &str) -> Action {
        self.interpret(&RecognizedUtterance::new(text))
    }
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_phrases() {
        let interpreter = CommandInterpreter::default();
        assert_eq!(interpreter.interpret_text("ip address"), Action::AnnounceIp);
        assert_eq!(
            interpreter.interpret_text("play youtube"),
            Action::PlayStream(DEFAULT_STREAM_URL.to_string())
        );
        assert_eq!(
            interpreter.interpret_text("show me some news"),
            Action::PlayNewsDigest
        );
        assert_eq!(interpreter.interpret_text("banana"), Action::Unknown);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let interpreter = CommandInterpreter::default();
        assert_eq!(interpreter.interpret_text("  IP Address "), Action::AnnounceIp);
        assert_eq!(
            interpreter.interpret_text("Show Me Some News"),
            Action::PlayNewsDigest
        );
    }

    #[test]
    fn test_no_partial_matches() {
        let interpreter = CommandInterpreter::default();
        assert_eq!(interpreter.interpret_text("what is my ip address"), Action::Unknown);
        assert_eq!(interpreter.interpret_text("play"), Action::Unknown);
        assert_eq!(interpreter.interpret_text(""), Action::Unknown);
    }

    #[test]
    fn test_configured_stream_url() {
        let interpreter = CommandInterpreter::new("http://radio.local/stream");
        assert_eq!(
            interpreter.interpret_text("play youtube"),
            Action::PlayStream("http://radio.local/stream".to_string())
        );
    }

    #[test]
    fn test_utterance_normalization() {
        let utterance = RecognizedUtterance::new("  Play YouTube\n");
        assert_eq!(utterance.raw, "  Play YouTube\n");
        assert_eq!(utterance.normalized, "play youtube");
        assert!(!utterance.is_empty());
        assert!(RecognizedUtterance::new("   ").is_empty());
    }

    #[test]
    fn test_action_predicates() {
        assert!(Action::AnnounceIp.is_known());
        assert!(!Action::Unknown.is_known());
        assert!(Action::PlayStream("x".into()).is_known());
    }
}
