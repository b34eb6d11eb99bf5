pub mod config;
pub mod orchestrator;

pub use config::ControllerConfig;
pub use orchestrator::{spawn_console_reader, Orchestrator, OrchestratorBuilder};
