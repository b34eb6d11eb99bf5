//! Spoken announcements
//!
//! Announcements run to completion on the calling thread. Unlike media jobs
//! they are never interrupted by a button press.
//!
//! The default backend shells out to a synthesis program (`espeak-ng`),
//! with the command line built from a template:
//! - `{text}`: the text to speak
//! - `{language}`: language tag, e.g. `en-US`
//! - `{voice}`: voice name, or the language when no voice is set
//! - `{volume}`: volume / amplitude value

use crate::{Result, VoiceKitError};
use serde::Deserialize;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Configuration for the announcement backend
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    /// Synthesis program
    pub program: String,

    /// Argument template
    pub args: Vec<String>,

    /// Default language
    pub language: String,

    /// Default voice (falls back to the language)
    pub voice: Option<String>,

    /// Default volume
    pub volume: u32,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            args: vec![
                "-v".to_string(),
                "{voice}".to_string(),
                "-a".to_string(),
                "{volume}".to_string(),
                "{text}".to_string(),
            ],
            language: "en-US".to_string(),
            voice: None,
            volume: 10,
        }
    }
}

impl AnnounceConfig {
    /// The voice profile announcements use unless told otherwise
    pub fn default_voice(&self) -> VoiceProfile {
        VoiceProfile {
            language: self.language.clone(),
            voice: self.voice.clone(),
            volume: self.volume,
        }
    }
}

/// Voice parameters for one announcement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceProfile {
    pub language: String,
    pub voice: Option<String>,
    pub volume: u32,
}

impl VoiceProfile {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            voice: None,
            volume: 10,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_volume(mut self, volume: u32) -> Self {
        self.volume = volume;
        self
    }
}

/// A synthesis-and-playback backend
pub trait Announcer: Send + Sync {
    /// Speak `text`, blocking until playback completes
    fn say(&self, text: &str, voice: &VoiceProfile) -> Result<()>;
}

/// Announcer that runs an external synthesis program
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
}

impl CommandAnnouncer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &AnnounceConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

impl Announcer for CommandAnnouncer {
    fn say(&self, text: &str, voice: &VoiceProfile) -> Result<()> {
        let args = expand_args(&self.args, text, voice);
        debug!(program = %self.program, ?args, "Running synthesis");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                VoiceKitError::AnnouncementError(format!(
                    "Failed to run {}: {}",
                    self.program, e
                ))
            })?;

        if !output.status.success() {
            return Err(VoiceKitError::AnnouncementError(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

/// Announcer that only logs, for running without a speaker
#[derive(Default)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn say(&self, text: &str, voice: &VoiceProfile) -> Result<()> {
        info!(language = %voice.language, "Announce: {}", text);
        Ok(())
    }
}

/// Facade used by the controller: a backend plus the default voice
pub struct AnnouncementSink {
    backend: Box<dyn Announcer>,
    default_voice: VoiceProfile,
}

impl AnnouncementSink {
    pub fn new(backend: Box<dyn Announcer>, default_voice: VoiceProfile) -> Self {
        Self {
            backend,
            default_voice,
        }
    }

    pub fn from_config(config: &AnnounceConfig) -> Self {
        Self::new(
            Box::new(CommandAnnouncer::from_config(config)),
            config.default_voice(),
        )
    }

    /// Speak with the default voice
    pub fn say(&self, text: &str) -> Result<()> {
        self.backend.say(text, &self.default_voice)
    }

    /// Speak with explicit voice parameters
    pub fn say_with(&self, text: &str, voice: &VoiceProfile) -> Result<()> {
        self.backend.say(text, voice)
    }

    pub fn default_voice(&self) -> &VoiceProfile {
        &self.default_voice
    }
}

/// Substitute placeholders in the argument template
pub fn expand_args(template: &[String], text: &str, voice: &VoiceProfile) -> Vec<String> {
    let voice_name = voice.voice.as_deref().unwrap_or(&voice.language);
    let volume = voice.volume.to_string();

    template
        .iter()
        .map(|arg| {
            arg.replace("{language}", &voice.language)
                .replace("{voice}", voice_name)
                .replace("{volume}", &volume)
                .replace("{text}", text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Recorder {
        said: Arc<Mutex<Vec<(String, VoiceProfile)>>>,
    }

    impl Announcer for Recorder {
        fn say(&self, text: &str, voice: &VoiceProfile) -> Result<()> {
            self.said.lock().push((text.to_string(), voice.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_expand_default_template() {
        let config = AnnounceConfig::default();
        let args = expand_args(&config.args, "hello there", &config.default_voice());
        assert_eq!(args, vec!["-v", "en-US", "-a", "10", "hello there"]);
    }

    #[test]
    fn test_expand_prefers_voice() {
        let voice = VoiceProfile::new("en-GB").with_voice("mb-en1").with_volume(80);
        let template = vec!["--lang={language}".to_string(), "{voice}".to_string(), "{volume}".to_string()];
        let args = expand_args(&template, "x", &voice);
        assert_eq!(args, vec!["--lang=en-GB", "mb-en1", "80"]);
    }

    #[test]
    fn test_text_with_placeholder_syntax_is_not_reexpanded() {
        let voice = VoiceProfile::new("en-US");
        let args = expand_args(&["{text}".to_string()], "say {volume}", &voice);
        assert_eq!(args, vec!["say {volume}"]);
    }

    #[test]
    fn test_sink_uses_default_voice() {
        let said = Arc::new(Mutex::new(Vec::new()));
        let sink = AnnouncementSink::new(
            Box::new(Recorder {
                said: Arc::clone(&said),
            }),
            VoiceProfile::new("de-DE"),
        );

        sink.say("hallo").unwrap();
        sink.say_with("hi", &VoiceProfile::new("en-US")).unwrap();

        let said = said.lock();
        assert_eq!(said[0].0, "hallo");
        assert_eq!(said[0].1.language, "de-DE");
        assert_eq!(said[1].1.language, "en-US");
    }

    #[cfg(unix)]
    #[test]
    fn test_sink_from_config_runs_configured_program() {
        let config = AnnounceConfig {
            program: "true".into(),
            language: "fr-FR".into(),
            volume: 7,
            ..AnnounceConfig::default()
        };
        let sink = AnnouncementSink::from_config(&config);

        assert_eq!(sink.default_voice().language, "fr-FR");
        assert_eq!(sink.default_voice().volume, 7);
        assert!(sink.say("bonjour").is_ok());
    }

    #[test]
    fn test_log_announcer_succeeds() {
        assert!(LogAnnouncer.say("hello", &VoiceProfile::new("en-US")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_announcer_exit_status() {
        let voice = VoiceProfile::new("en-US");
        assert!(CommandAnnouncer::new("true", vec![]).say("x", &voice).is_ok());

        let err = CommandAnnouncer::new("false", vec![]).say("x", &voice).unwrap_err();
        assert!(matches!(err, VoiceKitError::AnnouncementError(_)));
    }

    #[test]
    fn test_command_announcer_missing_program() {
        let announcer = CommandAnnouncer::new("voicekit-no-such-synth", vec!["{text}".into()]);
        let err = announcer.say("x", &VoiceProfile::new("en-US")).unwrap_err();
        assert!(matches!(err, VoiceKitError::AnnouncementError(_)));
    }
}
