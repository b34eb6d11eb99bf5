pub mod media_job;

pub use media_job::{MediaCommand, MediaConfig, MediaJob, MediaJobSupervisor};
