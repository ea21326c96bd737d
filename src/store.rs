use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::models::ProbeResult;

/// Position of a result in the store's append order. Starts at 1.
pub type Seq = u64;

/// Bounded, insertion-ordered history of probe results.
///
/// Once `capacity` is reached every append evicts the oldest entry. Each
/// append is numbered so observers can tell whether a live result was
/// already part of their catch-up batch.
pub struct ResultStore {
    capacity: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: VecDeque<(Seq, ProbeResult)>,
    last_seq: Seq,
}

impl ResultStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                last_seq: 0,
            }),
        }
    }

    /// Appends `result` and returns its sequence number.
    pub fn push(&self, result: ProbeResult) -> Seq {
        let mut inner = self.inner.lock();
        while inner.entries.len() >= self.capacity {
            inner.entries.pop_front();
        }
        inner.last_seq += 1;
        let seq = inner.last_seq;
        inner.entries.push_back((seq, result));
        seq
    }

    /// Up to `n` most recent results, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ProbeResult> {
        self.recent_numbered(n).into_iter().map(|(_, r)| r).collect()
    }

    /// Like [`recent`](Self::recent), keeping each entry's sequence number.
    pub fn recent_numbered(&self, n: usize) -> Vec<(Seq, ProbeResult)> {
        let inner = self.inner.lock();
        let skip = inner.entries.len().saturating_sub(n);
        inner.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
