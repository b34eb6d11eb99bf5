pub mod button;

pub use button::{ButtonInput, ChannelButton, PressHandler};
