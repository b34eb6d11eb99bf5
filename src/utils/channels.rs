use crate::engine::{ConsoleInput, EngineEvent};
use crate::{Result, VoiceKitError};
use crossbeam_channel::{bounded, Receiver, Sender};

/// Senders for both trigger sources
///
/// Console input (or a test) uses this to feed the engine event stream and
/// press the button. Dropping the last clone closes the input, which lets
/// the event loop finish once pending events are handled.
#[derive(Clone)]
pub struct TriggerChannels {
    pub event_tx: Sender<EngineEvent>,
    pub press_tx: Sender<()>,
    _open: Sender<()>,
}

impl TriggerChannels {
    /// Wrap the two senders, returning the receiver that disconnects when
    /// every clone has been dropped
    pub fn new(event_tx: Sender<EngineEvent>, press_tx: Sender<()>) -> (Self, Receiver<()>) {
        let (open_tx, closed_rx) = bounded(0);
        let channels = Self {
            event_tx,
            press_tx,
            _open: open_tx,
        };
        (channels, closed_rx)
    }

    pub fn send_event(&self, event: EngineEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| VoiceKitError::ChannelError(format!("Event stream closed: {}", e)))
    }

    pub fn press(&self) -> Result<()> {
        self.press_tx
            .send(())
            .map_err(|e| VoiceKitError::ChannelError(format!("Button input closed: {}", e)))
    }

    /// Route one parsed console input
    pub fn send(&self, input: ConsoleInput) -> Result<()> {
        match input {
            ConsoleInput::Event(event) => self.send_event(event),
            ConsoleInput::Press => self.press(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, RecvError};

    #[test]
    fn test_routes_inputs() {
        let (event_tx, event_rx) = unbounded();
        let (press_tx, press_rx) = unbounded();
        let (channels, _closed) = TriggerChannels::new(event_tx, press_tx);

        channels.send(ConsoleInput::Event(EngineEvent::Ready)).unwrap();
        channels.send(ConsoleInput::Press).unwrap();

        assert_eq!(event_rx.try_recv().unwrap(), EngineEvent::Ready);
        assert!(press_rx.try_recv().is_ok());
    }

    #[test]
    fn test_closed_after_last_clone_dropped() {
        let (event_tx, _event_rx) = unbounded();
        let (press_tx, _press_rx) = unbounded();
        let (channels, closed) = TriggerChannels::new(event_tx, press_tx);

        let clone = channels.clone();
        drop(channels);
        assert!(closed.try_recv().is_err());
        drop(clone);
        assert_eq!(closed.recv(), Err(RecvError));
    }

    #[test]
    fn test_press_without_button_fails() {
        let (event_tx, _event_rx) = unbounded();
        let (press_tx, press_rx) = unbounded();
        let (channels, _closed) = TriggerChannels::new(event_tx, press_tx);
        drop(press_rx);

        assert!(matches!(
            channels.press(),
            Err(VoiceKitError::ChannelError(_))
        ));
    }
}
