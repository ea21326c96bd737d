//! Fan-out of probe events to live observers.
//!
//! Each observer owns the receiving half of a bounded channel. Publishing
//! snapshots the sender set, delivers without holding the lock, then prunes
//! every observer whose channel turned out to be closed.
//!
//! Results kept in the history carry their store sequence number. An observer
//! drops a live result whose number falls inside its catch-up batch, so a
//! result stored before the subscription and published after it is seen once.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::models::Event;
use crate::probe::Measurement;
use crate::store::{ResultStore, Seq};

pub type ObserverId = u64;

#[derive(Debug, Clone)]
struct Delivery {
    seq: Option<Seq>,
    event: Event,
}

/// Receiving side handed to a connected client.
pub struct Subscription {
    id: ObserverId,
    receiver: mpsc::Receiver<Delivery>,
    replayed: Option<RangeInclusive<Seq>>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Next event, or `None` once the broadcaster dropped this observer.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            let delivery = self.receiver.recv().await?;
            if !self.already_replayed(&delivery) {
                return Some(delivery.event);
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            let delivery = self.receiver.try_recv().ok()?;
            if !self.already_replayed(&delivery) {
                return Some(delivery.event);
            }
        }
    }

    fn already_replayed(&self, delivery: &Delivery) -> bool {
        match (&self.replayed, delivery.seq) {
            (Some(range), Some(seq)) => range.contains(&seq),
            _ => false,
        }
    }
}

pub struct Broadcaster {
    store: Arc<ResultStore>,
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<Delivery>>>,
    next_id: AtomicU64,
    catch_up_len: usize,
    buffer: usize,
}

impl Broadcaster {
    pub fn new(store: Arc<ResultStore>, catch_up_len: usize, buffer: usize) -> Self {
        Self {
            store,
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            catch_up_len,
            buffer: buffer.max(1),
        }
    }

    /// Registers a new observer. Its first event is always the catch-up
    /// `History` batch, queued before the observer becomes visible to
    /// `publish`.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer);

        let numbered = self.store.recent_numbered(self.catch_up_len);
        let replayed = match (numbered.first(), numbered.last()) {
            (Some((first, _)), Some((last, _))) => Some(*first..=*last),
            _ => None,
        };
        let catch_up: Vec<_> = numbered.into_iter().map(|(_, r)| r).collect();
        let replayed_len = catch_up.len();

        // buffer >= 1, so the fresh channel always has room for the batch
        let queued = sender.try_send(Delivery {
            seq: None,
            event: Event::History(catch_up),
        });
        debug_assert!(queued.is_ok(), "catch-up batch must fit a fresh channel");

        let mut observers = self.observers.lock();
        observers.insert(id, sender);
        info!("Observer {} connected ({} live, {} replayed)", id, observers.len(), replayed_len);

        Subscription {
            id,
            receiver,
            replayed,
        }
    }

    /// Removes an observer. Unknown or already removed ids are ignored.
    pub fn unsubscribe(&self, id: ObserverId) {
        let mut observers = self.observers.lock();
        if observers.remove(&id).is_some() {
            info!("Observer {} disconnected ({} live)", id, observers.len());
        }
    }

    /// Delivers `event` to every live observer and returns how many accepted it.
    pub fn publish(&self, event: Event) -> usize {
        self.deliver(Delivery { seq: None, event })
    }

    /// Publishes a probe outcome as a `Result` event. Observers whose
    /// catch-up batch already held it skip it.
    pub fn publish_measurement(&self, measurement: Measurement) -> usize {
        self.deliver(Delivery {
            seq: measurement.seq,
            event: Event::Result(measurement.result),
        })
    }

    fn deliver(&self, delivery: Delivery) -> usize {
        let targets: Vec<(ObserverId, mpsc::Sender<Delivery>)> = self
            .observers
            .lock()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sender) in targets {
            match sender.try_send(delivery.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Observer {} is lagging, event dropped", id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Observer {} channel closed, pruning", id);
                    closed.push(id);
                }
            }
        }

        if !closed.is_empty() {
            let mut observers = self.observers.lock();
            for id in closed {
                observers.remove(&id);
            }
        }

        delivered
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }
}
