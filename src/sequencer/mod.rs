pub mod clock;
pub mod scheduler;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::pattern::TrackId;

pub use clock::{StepFire, TICKS_PER_STEP};
pub use scheduler::{Sequencer, SharedState};

/// Notifications for whoever observes the transport (UI, CLI, tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEvent {
    Started,
    Stopped,
    /// An unmuted track reached a new step.
    StepChanged { track: TrackId, step: usize },
    /// Opaque heartbeat, once per step-length of global ticks.
    Beat(u64),
    /// Auto-evolution rewrote the patterns.
    Evolved { tick: u64 },
}

const EVENT_CAPACITY: usize = 1024;

/// Bounded, non-blocking event fan-in. Producers never wait; when the
/// observer falls behind, events are dropped and a single warning is logged
/// per burst.
#[derive(Clone)]
pub(crate) struct EventBus {
    tx: Sender<SequencerEvent>,
    rx: Receiver<SequencerEvent>,
    dropping: Arc<AtomicBool>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (tx, rx) = bounded(EVENT_CAPACITY);
        Self {
            tx,
            rx,
            dropping: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn emit(&self, event: SequencerEvent) {
        match self.tx.try_send(event) {
            Ok(()) => self.dropping.store(false, Ordering::Relaxed),
            Err(TrySendError::Full(_)) => {
                if !self.dropping.swap(true, Ordering::Relaxed) {
                    tracing::warn!("sequencer event queue full, dropping events");
                }
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub(crate) fn drain(&self) -> Vec<SequencerEvent> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_drops_when_full() {
        let bus = EventBus::new();
        for i in 0..(EVENT_CAPACITY as u64 + 10) {
            bus.emit(SequencerEvent::Beat(i));
        }
        let events = bus.drain();
        assert_eq!(events.len(), EVENT_CAPACITY);
        assert_eq!(events[0], SequencerEvent::Beat(0));
        assert!(bus.drain().is_empty());

        bus.emit(SequencerEvent::Started);
        assert_eq!(bus.drain(), vec![SequencerEvent::Started]);
    }
}
