//! Fan-out event broadcast to UI observers.
//!
//! Each observer owns a bounded queue. Publishing never blocks the engine:
//! a full queue drops that observer's copy of the event and the rest are
//! unaffected; per-observer ordering is the channel's FIFO order. Closed
//! observers are reaped on the next publish.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use gridlink_model::Event;

pub type ObserverId = u64;

const DEFAULT_OBSERVER_QUEUE: usize = 256;

#[derive(Debug)]
pub struct Broadcaster {
    observers: DashMap<ObserverId, mpsc::Sender<Event>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_OBSERVER_QUEUE)
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(queue_capacity: usize) -> Self {
        Self {
            observers: DashMap::new(),
            next_id: AtomicU64::new(1),
            queue_capacity,
        }
    }

    /// Register an observer and get its event queue.
    pub fn subscribe(&self) -> (ObserverId, mpsc::Receiver<Event>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.observers.insert(id, tx);
        debug!(observer = id, "observer subscribed");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        if self.observers.remove(&id).is_some() {
            debug!(observer = id, "observer unsubscribed");
        }
    }

    /// Deliver one event to every observer, best-effort.
    pub fn publish(&self, event: Event) {
        let mut closed = Vec::new();
        for entry in self.observers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => {},
                Err(mpsc::error::TrySendError::Full(_)) => {
                    trace!(observer = entry.key(), "observer queue full, event dropped");
                },
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }
        for id in closed {
            self.unsubscribe(id);
        }
    }

    /// Deliver one event to a single observer (the subscribe-time snapshot).
    pub fn send_to(&self, id: ObserverId, event: Event) {
        if let Some(tx) = self.observers.get(&id) {
            let _ = tx.try_send(event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}
