//! Physical button input
//!
//! Press notifications are delivered on a dedicated thread, independent of
//! the engine's event thread.

use crate::{Result, VoiceKitError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Callback invoked on every press
pub type PressHandler = Box<dyn Fn() + Send + 'static>;

/// A source of button presses
pub trait ButtonInput: Send + Sync {
    /// Register the press handler. May only be called once.
    fn on_press(&self, handler: PressHandler) -> Result<()>;
}

/// Button backed by a channel of press notifications
///
/// Anything holding the sender (a GPIO watcher, the console reader, a test)
/// can press the button.
pub struct ChannelButton {
    press_rx: Mutex<Option<Receiver<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelButton {
    /// Create a button and the sender used to press it
    pub fn new() -> (Self, Sender<()>) {
        let (press_tx, press_rx) = unbounded();
        let button = Self {
            press_rx: Mutex::new(Some(press_rx)),
            worker: Mutex::new(None),
        };
        (button, press_tx)
    }

    /// Whether a handler has been registered
    pub fn is_registered(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Take the worker thread handle, if a handler was registered
    pub fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker.lock().take()
    }
}

impl ButtonInput for ChannelButton {
    fn on_press(&self, handler: PressHandler) -> Result<()> {
        let press_rx = self.press_rx.lock().take().ok_or_else(|| {
            VoiceKitError::ChannelError("Button handler already registered".into())
        })?;

        let stale = press_rx.try_iter().count();
        if stale > 0 {
            debug!("Discarded {} press(es) made before registration", stale);
        }

        let worker = thread::Builder::new()
            .name("button".into())
            .spawn(move || {
                info!("Button handler registered");
                for () in press_rx.iter() {
                    debug!("Button pressed");
                    handler();
                }
                debug!("Button input closed");
            })?;

        *self.worker.lock() = Some(worker);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_presses_reach_handler() {
        let (button, press_tx) = ChannelButton::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        button
            .on_press(Box::new(move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert!(button.is_registered());

        press_tx.send(()).unwrap();
        press_tx.send(()).unwrap();
        drop(press_tx);

        button.take_worker().unwrap().join().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_second_registration_fails() {
        let (button, _press_tx) = ChannelButton::new();
        button.on_press(Box::new(|| {})).unwrap();

        let err = button.on_press(Box::new(|| {})).unwrap_err();
        assert!(matches!(err, VoiceKitError::ChannelError(_)));
    }

    #[test]
    fn test_presses_before_registration_are_discarded() {
        let (button, press_tx) = ChannelButton::new();
        press_tx.send(()).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        button
            .on_press(Box::new(move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        drop(press_tx);

        button.take_worker().unwrap().join().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
