use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::Command;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicekit::integration::{spawn_console_reader, ControllerConfig, OrchestratorBuilder};
use voicekit::speech::LogAnnouncer;

/// Exit code when the hardware is not supported
const UNSUPPORTED_EXIT_CODE: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "voicekit", version, about = "Voice-activated appliance controller")]
struct Cli {
    /// Path to the TOML config file (defaults to $VOICEKIT_CONFIG or ./voicekit.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start the engine immediately instead of waiting for the audio stack
    #[arg(long)]
    no_startup_delay: bool,

    /// Log announcements instead of speaking them
    #[arg(long)]
    dry_run_announcer: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voicekit=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = ControllerConfig::load_or_default(cli.config.as_deref());
    if cli.no_startup_delay {
        config = config.without_startup_delay();
    }
    config.validate().context("Invalid configuration")?;

    if let Some(machine) = machine_type() {
        if !config.is_supported_machine(&machine) {
            error!(machine = %machine, "Cannot run the hotword controller on this hardware");
            std::process::exit(UNSUPPORTED_EXIT_CODE);
        }
    }

    // The audio stack on the device needs a moment after boot
    let delay = config.startup_delay();
    if !delay.is_zero() {
        info!("Waiting {:?} before starting", delay);
        std::thread::sleep(delay);
    }

    info!("Starting VoiceKit controller");

    let mut builder = OrchestratorBuilder::new().with_config(config);
    if cli.dry_run_announcer {
        builder = builder.with_announcer(Box::new(LogAnnouncer));
    }
    let (orchestrator, channels) = builder.build().context("Failed to build controller")?;

    let events = orchestrator.start().context("Failed to start event loop")?;
    spawn_console_reader(BufReader::new(std::io::stdin()), channels)
        .context("Failed to start console reader")?;

    let code = events
        .join()
        .map_err(|_| anyhow!("Engine event thread panicked"))?;

    info!(code, "Shutting down");
    std::process::exit(code)
}

/// Machine hardware name, as reported by `uname -m`
fn machine_type() -> Option<String> {
    match Command::new("uname").arg("-m").output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(output) => {
            warn!(status = %output.status, "uname failed; skipping hardware check");
            None
        }
        Err(e) => {
            warn!(error = %e, "uname unavailable; skipping hardware check");
            None
        }
    }
}
