//! Blocking priority queue of pending operations.
//!
//! Stop entries always dequeue before anything else; all other entries come
//! out in arrival order. The internal lock is only held to push or pop.

use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Items that can jump the queue.
pub trait Prioritized {
    /// True for entries that must be serviced before any other.
    fn is_stop(&self) -> bool;
}

struct Entry<T> {
    stop: bool,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.stop == other.stop && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // BinaryHeap is a max-heap: stop entries first, then the lowest sequence number
    fn cmp(&self, other: &Self) -> Ordering {
        self.stop
            .cmp(&other.stop)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Inner<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
    closed: bool,
}

/// A multi-producer, single-consumer blocking priority queue
pub struct OperationQueue<T> {
    inner: Mutex<Inner<T>>,
    available: Condvar,
}

impl<T: Prioritized> OperationQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Add an item and wake the consumer.
    ///
    /// Returns the item back if the queue has been closed.
    pub fn enqueue(&self, item: T) -> Result<(), T> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(item);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Entry {
            stop: item.is_stop(),
            seq,
            item,
        });
        drop(inner);

        self.available.notify_one();
        Ok(())
    }

    /// Remove the highest-priority item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn dequeue(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(entry) = inner.heap.pop() {
                return Some(entry.item);
            }
            if inner.closed {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Remove the highest-priority item without blocking.
    pub fn try_dequeue(&self) -> Option<T> {
        self.inner.lock().heap.pop().map(|entry| entry.item)
    }

    /// Remove and return every item for which `discard` is true, keeping
    /// the relative order of the rest.
    pub fn drain_where<F>(&self, mut discard: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut inner = self.inner.lock();
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.heap)
            .into_vec()
            .into_iter()
            .partition(|entry| discard(&entry.item));
        inner.heap = kept.into();

        let mut dropped = dropped;
        dropped.sort_by_key(|entry| entry.seq);
        dropped.into_iter().map(|entry| entry.item).collect()
    }

    /// Refuse further items and return everything still pending, in
    /// priority order.
    pub fn close(&self) -> Vec<T> {
        let mut inner = self.inner.lock();
        inner.closed = true;
        let pending = std::mem::take(&mut inner.heap).into_sorted_vec();
        drop(inner);

        self.available.notify_all();
        pending.into_iter().rev().map(|entry| entry.item).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }
}

impl<T: Prioritized> Default for OperationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
