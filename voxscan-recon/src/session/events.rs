//! Observer interface for scan sessions.
//!
//! Listeners subscribe to a bounded channel of [`ScanEvent`]s. The engine
//! never blocks on a listener: events for a full channel are dropped, and
//! channels whose receiver went away are forgotten.

use crate::session::SessionState;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use tracing::trace;

/// Buffered events per subscriber before new ones are dropped.
const DEFAULT_CAPACITY: usize = 256;

/// Notifications emitted by a [`crate::ScanEngine`]. All are advisory.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    StateChanged(SessionState),
    KeyframeCountChanged(usize),
    /// Depth at the center of the latest frame, in meters.
    DistanceChanged(f32),
    /// Reconstruction progress in `0..=1`.
    ProgressChanged(f32),
    ProcessingComplete,
    ResultReady { point_count: usize },
}

/// Fan-out of events to any number of subscribers.
#[derive(Debug)]
pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<ScanEvent>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<ScanEvent> {
        let (tx, rx) = bounded(self.capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn emit(&self, event: ScanEvent) {
        self.subscribers.lock().retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                trace!("Subscriber is full, dropping {:?}", dropped);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_gets_every_event() {
        let bus = EventBus::default();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.emit(ScanEvent::KeyframeCountChanged(3));
        bus.emit(ScanEvent::ProcessingComplete);

        for rx in [a, b] {
            let events: Vec<ScanEvent> = rx.try_iter().collect();
            assert_eq!(
                events,
                vec![ScanEvent::KeyframeCountChanged(3), ScanEvent::ProcessingComplete]
            );
        }
    }

    #[test]
    fn test_full_subscriber_does_not_block() {
        let bus = EventBus::new(2);
        let rx = bus.subscribe();
        for i in 0..10 {
            bus.emit(ScanEvent::KeyframeCountChanged(i));
        }
        let events: Vec<ScanEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![ScanEvent::KeyframeCountChanged(0), ScanEvent::KeyframeCountChanged(1)]
        );
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(ScanEvent::StateChanged(SessionState::Scanning));
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(rx.try_recv().unwrap(), ScanEvent::StateChanged(SessionState::Scanning));
    }

    #[test]
    fn test_emit_without_subscribers() {
        EventBus::default().emit(ScanEvent::DistanceChanged(0.5));
    }
}
