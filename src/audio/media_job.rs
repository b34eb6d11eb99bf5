//! Supervised background media playback
//!
//! A media job is an external audio-producing process (a stream player). The
//! supervisor owns at most one job; the presence of the handle is the
//! liveness signal. Starting a job always cancels the previous one first,
//! since the speaker cannot be shared.
//!
//! Cancellation is best effort and never fails from the caller's side:
//! SIGTERM, a bounded wait, then SIGKILL.

use crate::speech::commands::DEFAULT_STREAM_URL;
use crate::{Result, VoiceKitError};
use serde::Deserialize;
use std::fmt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Configuration for media playback
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Player executable
    pub player: String,

    /// Arguments placed before the stream URL
    pub player_args: Vec<String>,

    /// Stream played by the "play youtube" command
    pub stream_url: String,

    /// How long to wait after SIGTERM before killing the player
    pub terminate_timeout_ms: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            player: "mpv".to_string(),
            player_args: vec!["--vid".to_string(), "no".to_string(), "--ytdl".to_string()],
            stream_url: DEFAULT_STREAM_URL.to_string(),
            terminate_timeout_ms: 2000,
        }
    }
}

impl MediaConfig {
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }

    /// Build the player command line for a stream
    pub fn stream_command(&self, url: &str) -> MediaCommand {
        let mut args = self.player_args.clone();
        args.push(url.to_string());
        MediaCommand::new(self.player.clone(), args)
    }
}

/// Executable plus argument vector for a media job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl MediaCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A running media process
pub struct MediaJob {
    id: Uuid,
    command: MediaCommand,
    child: Child,
    started_at: Instant,
}

impl MediaJob {
    /// Launch the process without waiting on it
    pub fn spawn(command: MediaCommand) -> Result<Self> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                VoiceKitError::MediaJobError(format!("Failed to start {}: {}", command.program, e))
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            command,
            child,
            started_at: Instant::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn command(&self) -> &MediaCommand {
        &self.command
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Reap the process if it exited on its own
    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(job = %self.id, %status, "Media job exited on its own");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(job = %self.id, error = %e, "Failed to poll media job, treating as gone");
                true
            }
        }
    }

    /// Stop the process: SIGTERM, bounded wait, then SIGKILL
    fn terminate(mut self, timeout: Duration) {
        if self.has_exited() {
            return;
        }

        let pid = self.pid();
        send_terminate(&mut self.child);

        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    info!(job = %self.id, pid, %status, "Media job terminated");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
                Ok(None) => break,
                Err(e) => {
                    warn!(job = %self.id, pid, error = %e, "Failed to wait for media job");
                    break;
                }
            }
        }

        warn!(job = %self.id, pid, "Media job ignored SIGTERM, killing");
        if let Err(e) = self.child.kill() {
            warn!(job = %self.id, pid, error = %e, "Failed to kill media job");
        }
        if let Err(e) = self.child.wait() {
            warn!(job = %self.id, pid, error = %e, "Failed to reap media job");
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) {
    let pid = child.id() as libc::pid_t;
    // SAFETY: `pid` is our own child and has not been reaped yet, so it
    // cannot have been recycled for another process.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        warn!(pid, error = %std::io::Error::last_os_error(), "Failed to send SIGTERM");
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(pid = child.id(), error = %e, "Failed to stop media job");
    }
}

/// Owns zero or one running media job
pub struct MediaJobSupervisor {
    current: Option<MediaJob>,
    terminate_timeout: Duration,
}

impl MediaJobSupervisor {
    pub fn new(terminate_timeout: Duration) -> Self {
        Self {
            current: None,
            terminate_timeout,
        }
    }

    /// Start a job, cancelling any job already running
    ///
    /// Returns immediately after the process is launched.
    pub fn start(&mut self, command: MediaCommand) -> Result<Uuid> {
        self.cancel();

        let job = MediaJob::spawn(command)?;
        let id = job.id();
        info!(job = %id, pid = job.pid(), command = %job.command(), "Media job started");
        self.current = Some(job);
        Ok(id)
    }

    /// Cancel the running job, if any
    ///
    /// Returns whether a live job was stopped. Safe to call repeatedly and
    /// when the process already exited.
    pub fn cancel(&mut self) -> bool {
        let Some(mut job) = self.current.take() else {
            return false;
        };

        if job.has_exited() {
            return false;
        }

        info!(job = %job.id(), uptime_ms = job.uptime().as_millis() as u64, "Cancelling media job");
        job.terminate(self.terminate_timeout);
        true
    }

    /// Whether a job is running, reaping it if it has exited
    pub fn is_alive(&mut self) -> bool {
        let exited = match self.current.as_mut() {
            Some(job) => job.has_exited(),
            None => return false,
        };
        if exited {
            self.current = None;
        }
        !exited
    }

    /// Id of the current job handle, without polling the process
    pub fn current_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(MediaJob::id)
    }

    /// Pid of the current job handle
    pub fn current_pid(&self) -> Option<u32> {
        self.current.as_ref().map(MediaJob::pid)
    }
}

impl Default for MediaJobSupervisor {
    fn default() -> Self {
        Self::new(MediaConfig::default().terminate_timeout())
    }
}

impl Drop for MediaJobSupervisor {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleeper() -> MediaCommand {
        MediaCommand::new("sleep", vec!["30".to_string()])
    }

    #[test]
    fn test_cancel_without_job_is_noop() {
        let mut supervisor = MediaJobSupervisor::default();
        assert!(!supervisor.cancel());
        assert!(!supervisor.cancel());
        assert!(!supervisor.is_alive());
        assert!(supervisor.current_id().is_none());
    }

    #[test]
    fn test_stream_command() {
        let config = MediaConfig::default();
        let command = config.stream_command("http://example.com/live");
        assert_eq!(command.program, "mpv");
        assert_eq!(
            command.args,
            vec!["--vid", "no", "--ytdl", "http://example.com/live"]
        );
        assert_eq!(command.to_string(), "mpv --vid no --ytdl http://example.com/live");
    }

    #[test]
    fn test_missing_player_fails_cleanly() {
        let mut supervisor = MediaJobSupervisor::default();
        let err = supervisor
            .start(MediaCommand::new("voicekit-no-such-player", vec![]))
            .unwrap_err();
        assert!(matches!(err, VoiceKitError::MediaJobError(_)));
        assert!(!supervisor.is_alive());
    }

    #[cfg(unix)]
    #[test]
    fn test_start_and_cancel() {
        let mut supervisor = MediaJobSupervisor::new(Duration::from_secs(2));
        supervisor.start(sleeper()).unwrap();
        assert!(supervisor.is_alive());

        assert!(supervisor.cancel());
        assert!(!supervisor.is_alive());

        // Double cancel is a no-op
        assert!(!supervisor.cancel());
    }

    #[cfg(unix)]
    #[test]
    fn test_start_replaces_previous_job() {
        let mut supervisor = MediaJobSupervisor::new(Duration::from_secs(2));
        let first = supervisor.start(sleeper()).unwrap();
        let first_pid = supervisor.current_pid().unwrap();

        let second = supervisor.start(sleeper()).unwrap();
        assert_ne!(first, second);
        assert_eq!(supervisor.current_id(), Some(second));
        assert_ne!(supervisor.current_pid(), Some(first_pid));
        assert!(supervisor.is_alive());

        // The first process was reaped, so signal 0 can no longer reach it
        let rc = unsafe { libc::kill(first_pid as libc::pid_t, 0) };
        assert_ne!(rc, 0);

        supervisor.cancel();
    }

    #[cfg(unix)]
    #[test]
    fn test_job_that_exited_on_its_own() {
        let mut supervisor = MediaJobSupervisor::default();
        supervisor
            .start(MediaCommand::new("true", vec![]))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while supervisor.is_alive() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        assert!(!supervisor.is_alive());
        assert!(!supervisor.cancel());
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_is_bounded_when_sigterm_ignored() {
        let mut supervisor = MediaJobSupervisor::new(Duration::from_millis(200));
        supervisor
            .start(MediaCommand::new(
                "sh",
                vec!["-c".to_string(), "trap '' TERM; while :; do sleep 1; done".to_string()],
            ))
            .unwrap();
        // Give the shell time to install the trap
        thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        assert!(supervisor.cancel());
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!supervisor.is_alive());
    }
}
