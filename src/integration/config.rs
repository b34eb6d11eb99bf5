//! Configuration for the controller
//!
//! Provides centralized configuration for all components. Every field has a
//! default, so a TOML file only needs the values it changes:
//!
//! ```toml
//! startup_delay_ms = 0
//!
//! [media]
//! player = "mpv"
//! stream_url = "https://example.com/radio"
//!
//! [announce]
//! language = "en-GB"
//!
//! [news]
//! endpoint = "https://example.com/feed.json"
//! headline_count = 5
//! ```

use crate::audio::MediaConfig;
use crate::content::NewsConfig;
use crate::speech::AnnounceConfig;
use crate::{Result, VoiceKitError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "VOICEKIT_CONFIG";

/// Config file used when neither the CLI nor the environment names one
pub const DEFAULT_CONFIG_PATH: &str = "voicekit.toml";

/// Configuration for the complete controller
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Media playback
    pub media: MediaConfig,

    /// Announcement backend
    pub announce: AnnounceConfig,

    /// News feed
    pub news: NewsConfig,

    /// Delay before the engine is started, in milliseconds
    pub startup_delay_ms: u64,

    /// Machine types (`uname -m`) the controller refuses to run on
    pub unsupported_machines: Vec<String>,

    /// Optional file mirroring the status indicator
    pub status_file: Option<PathBuf>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            media: MediaConfig::default(),
            announce: AnnounceConfig::default(),
            news: NewsConfig::default(),
            startup_delay_ms: 3000,
            unsupported_machines: vec!["armv6l".to_string()],
            status_file: None,
        }
    }
}

impl ControllerConfig {
    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            VoiceKitError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            VoiceKitError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load from the given path, `VOICEKIT_CONFIG`, or `./voicekit.toml`,
    /// falling back to defaults when the file is missing or invalid
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        if !path.exists() {
            info!(path = %path.display(), "No config file found; using defaults");
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(error = %e, "Invalid config; using defaults");
                Self::default()
            }
        }
    }

    /// Set the media player command
    pub fn with_player(mut self, player: impl Into<String>, args: Vec<String>) -> Self {
        self.media.player = player.into();
        self.media.player_args = args;
        self
    }

    /// Set the stream played by the stream command
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.media.stream_url = url.into();
        self
    }

    /// Set the time allowed between SIGTERM and SIGKILL
    pub fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.media.terminate_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the synthesis program
    pub fn with_announcer(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.announce.program = program.into();
        self.announce.args = args;
        self
    }

    /// Set the news feed endpoint
    pub fn with_news_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.news.endpoint = endpoint.into();
        self
    }

    /// Skip the startup delay
    pub fn without_startup_delay(mut self) -> Self {
        self.startup_delay_ms = 0;
        self
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// Whether the controller may run on this machine type
    pub fn is_supported_machine(&self, machine: &str) -> bool {
        let machine = machine.trim();
        !self
            .unsupported_machines
            .iter()
            .any(|m| m.eq_ignore_ascii_case(machine))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.media.player.trim().is_empty() {
            return Err(VoiceKitError::ConfigError("media.player is required".into()));
        }
        if self.media.terminate_timeout_ms == 0 {
            return Err(VoiceKitError::ConfigError(
                "media.terminate_timeout_ms must be positive".into(),
            ));
        }
        if self.announce.program.trim().is_empty() {
            return Err(VoiceKitError::ConfigError("announce.program is required".into()));
        }
        if !self.announce.args.iter().any(|arg| arg.contains("{text}")) {
            return Err(VoiceKitError::ConfigError(
                "announce.args must contain a {text} placeholder".into(),
            ));
        }
        if self.news.headline_count == 0 {
            return Err(VoiceKitError::ConfigError(
                "news.headline_count must be positive".into(),
            ));
        }
        Ok(())
    }
}
