//! Main sequencing context.
//!
//! Work that must run on the thread owning the controller (permission
//! continuations) is posted here from arbitrary threads and drained by the
//! host's main loop.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Work item for the main context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainEvent {
    /// The camera access prompt was answered.
    AccessResolved { granted: bool },
}

/// Cloneable, `Send` handle for posting to a [`MainQueue`].
#[derive(Clone)]
pub struct MainDispatcher {
    tx: Sender<MainEvent>,
}

impl MainDispatcher {
    /// Post an event. Events posted after the queue is gone are dropped.
    pub fn dispatch(&self, event: MainEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("main queue closed, dropping {event:?}");
        }
    }
}

/// Unbounded FIFO of events for the main context.
pub struct MainQueue {
    tx: Sender<MainEvent>,
    rx: Receiver<MainEvent>,
}

impl MainQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn dispatcher(&self) -> MainDispatcher {
        MainDispatcher {
            tx: self.tx.clone(),
        }
    }

    /// Next pending event, without waiting.
    pub fn try_next(&self) -> Option<MainEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<MainEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for MainQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_delivered_in_order() {
        let queue = MainQueue::new();
        let dispatcher = queue.dispatcher();
        dispatcher.dispatch(MainEvent::AccessResolved { granted: false });
        dispatcher.dispatch(MainEvent::AccessResolved { granted: true });

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.try_next(),
            Some(MainEvent::AccessResolved { granted: false })
        );
        assert_eq!(
            queue.try_next(),
            Some(MainEvent::AccessResolved { granted: true })
        );
        assert!(queue.try_next().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn dispatch_from_another_thread() {
        let queue = MainQueue::new();
        let dispatcher = queue.dispatcher();
        std::thread::spawn(move || {
            dispatcher.dispatch(MainEvent::AccessResolved { granted: true });
        });

        assert_eq!(
            queue.next_timeout(Duration::from_secs(2)),
            Some(MainEvent::AccessResolved { granted: true })
        );
    }

    #[test]
    fn next_timeout_returns_none_when_idle() {
        let queue = MainQueue::new();
        assert!(queue.next_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn dispatch_after_queue_dropped_does_not_panic() {
        let queue = MainQueue::new();
        let dispatcher = queue.dispatcher();
        drop(queue);
        dispatcher.dispatch(MainEvent::AccessResolved { granted: true });
    }

    #[test]
    fn dispatcher_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MainDispatcher>();
    }
}
