//! Fixed-capacity blocking queue shared by the searcher and the controllers.
//!
//! The buffer is a circular array with `in`/`out` cursors. `put` waits on
//! `not_full` while every slot is occupied and `get` waits on `not_empty`
//! while none is. Items come out in the order they went in and each item is
//! handed to exactly one caller of `get`.
//!
//! Shutdown is not a buffer operation: producers enqueue one sentinel per
//! consumer instead.

use std::num::NonZeroUsize;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct Ring<T> {
    slots: Vec<Option<T>>,
    /// Next slot to write
    tail: usize,
    /// Next slot to read
    head: usize,
    len: usize,
}

/// Blocking bounded FIFO buffer
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    capacity: usize,
    ring: Mutex<Ring<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> BoundedBuffer<T> {
    /// Creates a buffer holding at most `capacity` items
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            capacity,
            ring: Mutex::new(Ring {
                slots,
                tail: 0,
                head: 0,
                len: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Lock the ring, recovering from poison.
    ///
    /// Every mutation leaves the ring consistent before anything that could
    /// panic runs, so a poisoned lock still guards valid state.
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `item`, blocking while the buffer is full
    pub fn put(&self, item: T) {
        let mut ring = self.lock();
        while ring.len == self.capacity {
            ring = self
                .not_full
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let tail = ring.tail;
        ring.slots[tail] = Some(item);
        ring.tail = (tail + 1) % self.capacity;
        ring.len += 1;
        drop(ring);

        self.not_empty.notify_one();
    }

    /// Removes the oldest item, blocking while the buffer is empty
    pub fn get(&self) -> T {
        let mut ring = self.lock();
        loop {
            if let Some(item) = Self::take_head(&mut ring, self.capacity) {
                drop(ring);
                self.not_full.notify_one();
                return item;
            }
            ring = self
                .not_empty
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes the oldest item if one is resident
    pub fn try_get(&self) -> Option<T> {
        let mut ring = self.lock();
        let item = Self::take_head(&mut ring, self.capacity);
        drop(ring);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    fn take_head(ring: &mut Ring<T>, capacity: usize) -> Option<T> {
        if ring.len == 0 {
            return None;
        }
        let head = ring.head;
        let item = ring.slots[head].take();
        ring.head = (head + 1) % capacity;
        ring.len -= 1;
        item
    }

    /// Number of resident items. A snapshot; may be stale immediately.
    pub fn len(&self) -> usize {
        self.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
