//! Lifecycle events emitted by the assistant engine
//!
//! Events arrive as an ordered stream. Names are accepted in several spellings
//! (`turn-started`, `turn_started`, `ON_CONVERSATION_TURN_STARTED`) so that
//! recorded engine logs can be replayed through the console engine.

use crate::{Result, VoiceKitError};
use serde::Deserialize;
use std::fmt;

/// A typed lifecycle event from the assistant engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine finished starting and can accept conversations
    Ready,

    /// A conversation turn started (hotword or explicit start)
    TurnStarted,

    /// The engine detected the end of the user's utterance
    EndOfUtterance,

    /// The turn completed normally
    TurnFinished,

    /// The turn timed out waiting for speech
    TurnTimeout,

    /// The assistant had no response to give
    NoResponse,

    /// Speech recognition finished, optionally carrying the recognized text
    SpeechRecognized { text: Option<String> },

    /// The engine reported an error
    Error { is_fatal: bool },

    /// Any event type the controller does not handle
    Other(String),
}

impl EngineEvent {
    /// Build an event from a type name and its optional payload fields
    pub fn from_parts(kind: &str, text: Option<String>, is_fatal: bool) -> Self {
        match normalize_kind(kind).as_str() {
            "ready" | "start-finished" => EngineEvent::Ready,
            "turn-started" | "conversation-turn-started" => EngineEvent::TurnStarted,
            "end-of-utterance" => EngineEvent::EndOfUtterance,
            "turn-finished" | "conversation-turn-finished" => EngineEvent::TurnFinished,
            "turn-timeout" | "conversation-turn-timeout" => EngineEvent::TurnTimeout,
            "no-response" => EngineEvent::NoResponse,
            "recognized" | "recognizing-speech-finished" => EngineEvent::SpeechRecognized { text },
            "error" | "assistant-error" => EngineEvent::Error { is_fatal },
            other => EngineEvent::Other(other.to_string()),
        }
    }

    /// Shorthand for a recognized-speech event carrying text
    pub fn recognized(text: impl Into<String>) -> Self {
        EngineEvent::SpeechRecognized {
            text: Some(text.into()),
        }
    }

    /// Whether this event ends the current turn
    pub fn is_terminating(&self) -> bool {
        matches!(
            self,
            EngineEvent::TurnFinished | EngineEvent::TurnTimeout | EngineEvent::NoResponse
        )
    }

    /// Whether this event carries a fatal error flag
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineEvent::Error { is_fatal: true })
    }

    /// Stable name used in logs
    pub fn name(&self) -> &str {
        match self {
            EngineEvent::Ready => "ready",
            EngineEvent::TurnStarted => "turn-started",
            EngineEvent::EndOfUtterance => "end-of-utterance",
            EngineEvent::TurnFinished => "turn-finished",
            EngineEvent::TurnTimeout => "turn-timeout",
            EngineEvent::NoResponse => "no-response",
            EngineEvent::SpeechRecognized { .. } => "recognized",
            EngineEvent::Error { .. } => "error",
            EngineEvent::Other(name) => name,
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::SpeechRecognized { text: Some(text) } => write!(f, "recognized({})", text),
            EngineEvent::Error { is_fatal: true } => write!(f, "error(fatal)"),
            other => write!(f, "{}", other.name()),
        }
    }
}

fn normalize_kind(kind: &str) -> String {
    let lowered = kind.trim().to_ascii_lowercase().replace('_', "-");
    match lowered.strip_prefix("on-") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// JSON form of an event: `{"type": "recognized", "text": "play youtube"}`
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    is_fatal: bool,
}

/// One line of console input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleInput {
    /// An engine lifecycle event
    Event(EngineEvent),
    /// A physical button press
    Press,
}

/// Parse a console line into an input
///
/// Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleInput>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if line.starts_with('{') {
        let wire: WireEvent = serde_json::from_str(line)
            .map_err(|e| VoiceKitError::ParseError(format!("Invalid event JSON: {}", e)))?;
        return Ok(Some(ConsoleInput::Event(EngineEvent::from_parts(
            &wire.kind,
            wire.text,
            wire.is_fatal,
        ))));
    }

    let (kind, rest) = match line.split_once(char::is_whitespace) {
        Some((kind, rest)) => (kind, rest.trim()),
        None => (line, ""),
    };

    if matches!(kind.to_ascii_lowercase().as_str(), "press" | "button") {
        return Ok(Some(ConsoleInput::Press));
    }

    let text = if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    };
    let is_fatal = rest.eq_ignore_ascii_case("fatal");

    Ok(Some(ConsoleInput::Event(EngineEvent::from_parts(
        kind, text, is_fatal,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_spellings() {
        assert_eq!(EngineEvent::from_parts("ready", None, false), EngineEvent::Ready);
        assert_eq!(
            EngineEvent::from_parts("ON_START_FINISHED", None, false),
            EngineEvent::Ready
        );
        assert_eq!(
            EngineEvent::from_parts("ON_CONVERSATION_TURN_STARTED", None, false),
            EngineEvent::TurnStarted
        );
        assert_eq!(
            EngineEvent::from_parts("turn_timeout", None, false),
            EngineEvent::TurnTimeout
        );
        assert_eq!(
            EngineEvent::from_parts("ON_END_OF_UTTERANCE", None, false),
            EngineEvent::EndOfUtterance
        );
    }

    #[test]
    fn test_unknown_kind_is_other() {
        let event = EngineEvent::from_parts("ON_MUTED_CHANGED", None, false);
        assert_eq!(event, EngineEvent::Other("muted-changed".to_string()));
        assert!(!event.is_terminating());
    }

    #[test]
    fn test_terminating_events() {
        assert!(EngineEvent::TurnFinished.is_terminating());
        assert!(EngineEvent::TurnTimeout.is_terminating());
        assert!(EngineEvent::NoResponse.is_terminating());
        assert!(!EngineEvent::TurnStarted.is_terminating());
        assert!(!EngineEvent::Error { is_fatal: true }.is_terminating());
    }

    #[test]
    fn test_parse_plain_lines() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   # comment").unwrap(), None);
        assert_eq!(parse_line("press").unwrap(), Some(ConsoleInput::Press));
        assert_eq!(
            parse_line("recognized  Play YouTube ").unwrap(),
            Some(ConsoleInput::Event(EngineEvent::recognized("Play YouTube")))
        );
        assert_eq!(
            parse_line("error fatal").unwrap(),
            Some(ConsoleInput::Event(EngineEvent::Error { is_fatal: true }))
        );
        assert_eq!(
            parse_line("error").unwrap(),
            Some(ConsoleInput::Event(EngineEvent::Error { is_fatal: false }))
        );
    }

    #[test]
    fn test_parse_json_lines() {
        let input = parse_line(r#"{"type": "ON_RECOGNIZING_SPEECH_FINISHED", "text": "ip address"}"#)
            .unwrap();
        assert_eq!(
            input,
            Some(ConsoleInput::Event(EngineEvent::recognized("ip address")))
        );

        let input = parse_line(r#"{"type": "ON_ASSISTANT_ERROR", "is_fatal": true}"#).unwrap();
        assert!(matches!(input, Some(ConsoleInput::Event(e)) if e.is_fatal()));
    }

    #[test]
    fn test_parse_bad_json() {
        let err = parse_line("{not json").unwrap_err();
        assert!(matches!(err, VoiceKitError::ParseError(_)));
    }

    #[test]
    fn test_recognized_without_text() {
        let input = parse_line("recognized").unwrap();
        assert_eq!(
            input,
            Some(ConsoleInput::Event(EngineEvent::SpeechRecognized { text: None }))
        );
    }
}
