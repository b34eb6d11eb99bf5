pub mod channels;

pub use channels::TriggerChannels;
