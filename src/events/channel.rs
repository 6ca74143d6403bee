//! Event channel implementation using crossbeam-channel.
//!
//! A thin wrapper that lets the engine report progress without knowing who
//! (if anyone) is listening.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Sends events from the engine.
///
/// Cloneable and sendable across threads; workers hold clones.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event.
    ///
    /// If the receiver has been dropped the event is silently discarded,
    /// which makes progress reporting optional everywhere.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receives engine events. Held by UI layers.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Returns an iterator over received events; ends when all senders drop
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for event channels
pub struct EventChannel;

impl EventChannel {
    /// Create a new unbounded event channel. Events are small; the engine
    /// must never block on a slow listener.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A no-op sender for runs that don't need progress reporting (tests,
/// headless invocations).
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PipelineEvent, ScanEvent};
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Scan(ScanEvent::CandidateFound {
                path: PathBuf::from("/dump/a.jpg"),
            }));
        });

        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Scan(ScanEvent::CandidateFound { path }) => {
                assert_eq!(path, PathBuf::from("/dump/a.jpg"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.send(Event::Pipeline(PipelineEvent::Started));
    }
}
