// Tradeflow - Adaptive entropy pipeline for trader actions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Bounded two-lock FIFO queue with batch pops and backpressure.
//!
//! Items live in a singly linked chain that starts at a dummy node. The
//! head mutex owns the dummy and guards pops; the tail mutex owns the
//! last node and guards pushes, so a pop in progress never blocks a push
//! and vice versa. A shared atomic counter is the single source of truth
//! for capacity and emptiness decisions.
//!
//! Pushes never block: a full queue hands the item back. Producers that
//! want to throttle call [`BoundedQueue::wait_for_backpressure`], which
//! returns once occupancy falls below the backpressure threshold.

use crate::config::{backpressure_threshold, QueueConfig};
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct Node<T> {
    value: Option<T>,
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    fn alloc(value: Option<T>) -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            value,
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }
}

/// Chain position owned by one of the two end locks.
struct NodePtr<T>(*mut Node<T>);

// SAFETY: a NodePtr is only dereferenced by the holder of the mutex that
// wraps it, and the nodes it reaches own `T` values that move between
// threads, hence `T: Send`.
unsafe impl<T: Send> Send for NodePtr<T> {}

/// Fixed-capacity multi-producer multi-consumer FIFO queue.
pub struct BoundedQueue<T> {
    head: Mutex<NodePtr<T>>,
    tail: Mutex<NodePtr<T>>,
    size: AtomicUsize,
    capacity: AtomicUsize,
    batch_size: AtomicUsize,
    threshold: AtomicUsize,
    backpressure_ratio: f64,
    /// Threads parked in `wait_and_pop`; lets pushes skip the head lock
    /// when nobody is waiting.
    pop_waiters: AtomicUsize,
    /// Bumped by `notify_all` to release backpressure waiters.
    wake_epoch: AtomicU64,
    item_ready: Condvar,
    relieved: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create a queue with the default 80% backpressure ratio.
    ///
    /// A `batch_size` of zero is treated as one.
    pub fn new(capacity: usize, batch_size: usize) -> Self {
        Self::with_config(&QueueConfig::new(capacity, batch_size))
    }

    /// Create a queue from configuration.
    pub fn with_config(config: &QueueConfig) -> Self {
        let dummy = Node::alloc(None);
        Self {
            head: Mutex::new(NodePtr(dummy)),
            tail: Mutex::new(NodePtr(dummy)),
            size: AtomicUsize::new(0),
            capacity: AtomicUsize::new(config.capacity),
            batch_size: AtomicUsize::new(config.batch_size.max(1)),
            threshold: AtomicUsize::new(config.threshold_for(config.capacity)),
            backpressure_ratio: config.backpressure_ratio,
            pop_waiters: AtomicUsize::new(0),
            wake_epoch: AtomicU64::new(0),
            item_ready: Condvar::new(),
            relieved: Condvar::new(),
        }
    }

    /// Append an item at the tail.
    ///
    /// Returns the item back if the queue already holds `capacity`
    /// items. Never blocks beyond the tail lock.
    pub fn push(&self, item: T) -> Result<(), T> {
        {
            let mut tail = lock(&self.tail);
            if self.size.load(Ordering::SeqCst) >= self.capacity.load(Ordering::Relaxed) {
                return Err(item);
            }

            // Count first so a racing pop can never drive the counter
            // below the number of linked nodes.
            self.size.fetch_add(1, Ordering::SeqCst);
            let node = Node::alloc(Some(item));
            // SAFETY: the tail pointer always names the live last node and
            // only the tail-lock holder writes its `next` link.
            unsafe { (*tail.0).next.store(node, Ordering::SeqCst) };
            tail.0 = node;
        }

        if self.pop_waiters.load(Ordering::SeqCst) > 0 {
            // Taking the head lock orders this wakeup after the waiter's
            // emptiness check, so it cannot be lost.
            let _head = lock(&self.head);
            self.item_ready.notify_one();
        }

        Ok(())
    }

    /// Remove the oldest item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        let mut head = lock(&self.head);
        let item = self.unlink_front(&mut head)?;
        self.release(1);
        Some(item)
    }

    /// Drain up to `batch_size` of the oldest items into `batch`.
    ///
    /// Returns `false` and leaves `batch` untouched when the queue is
    /// empty. Otherwise `batch` is cleared first, then filled; fewer than
    /// `batch_size` items are taken if the queue runs dry.
    pub fn try_pop_batch(&self, batch: &mut Vec<T>) -> bool {
        let mut head = lock(&self.head);
        if self.front_is_empty(&head) {
            return false;
        }

        batch.clear();
        let limit = self.batch_size();
        batch.reserve(limit.min(self.len()));

        let mut removed = 0;
        while removed < limit {
            match self.unlink_front(&mut head) {
                Some(item) => {
                    batch.push(item);
                    removed += 1;
                }
                None => break,
            }
        }

        self.release(removed);
        true
    }

    /// Block until an item is available, then remove it.
    pub fn wait_and_pop(&self) -> T {
        let mut head = lock(&self.head);
        self.pop_waiters.fetch_add(1, Ordering::SeqCst);
        let item = loop {
            if let Some(item) = self.unlink_front(&mut head) {
                break item;
            }
            head = self
                .item_ready
                .wait(head)
                .unwrap_or_else(PoisonError::into_inner);
        };
        self.pop_waiters.fetch_sub(1, Ordering::SeqCst);
        self.release(1);
        item
    }

    /// Like [`wait_and_pop`](Self::wait_and_pop) but gives up after `timeout`.
    pub fn wait_and_pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut head = lock(&self.head);
        self.pop_waiters.fetch_add(1, Ordering::SeqCst);
        let item = loop {
            if let Some(item) = self.unlink_front(&mut head) {
                break Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                break None;
            }
            head = self
                .item_ready
                .wait_timeout(head, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        };
        self.pop_waiters.fetch_sub(1, Ordering::SeqCst);
        if item.is_some() {
            self.release(1);
        }
        item
    }

    /// Block until occupancy drops below the backpressure threshold.
    ///
    /// [`notify_all`](Self::notify_all) also releases the caller, even if
    /// the queue is still saturated.
    pub fn wait_for_backpressure(&self) {
        let mut head = lock(&self.head);
        let epoch = self.wake_epoch.load(Ordering::SeqCst);
        while self.is_saturated() && self.wake_epoch.load(Ordering::SeqCst) == epoch {
            head = self
                .relieved
                .wait(head)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Bounded variant of [`wait_for_backpressure`](Self::wait_for_backpressure).
    ///
    /// Returns `true` if occupancy is below the threshold on return.
    pub fn wait_for_backpressure_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut head = lock(&self.head);
        let epoch = self.wake_epoch.load(Ordering::SeqCst);
        while self.is_saturated() && self.wake_epoch.load(Ordering::SeqCst) == epoch {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            head = self
                .relieved
                .wait_timeout(head, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        !self.is_saturated()
    }

    /// Check if the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.size.load(Ordering::SeqCst) == 0
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.load(Ordering::Relaxed)
    }

    /// Occupancy at or above which producers should throttle.
    pub fn backpressure_threshold(&self) -> usize {
        self.threshold.load(Ordering::Relaxed)
    }

    /// Change the capacity and recompute the backpressure threshold.
    ///
    /// Not serialized with in-flight pushes; items already queued beyond
    /// a lowered capacity stay until popped.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
        let threshold = backpressure_threshold(capacity, self.backpressure_ratio);
        self.threshold.store(threshold, Ordering::Relaxed);

        let _head = lock(&self.head);
        self.relieved.notify_all();
    }

    /// Change the maximum batch pop size (zero is treated as one).
    pub fn set_batch_size(&self, batch_size: usize) {
        self.batch_size.store(batch_size.max(1), Ordering::Relaxed);
    }

    /// Wake every waiter on both conditions. Used for shutdown.
    pub fn notify_all(&self) {
        let _head = lock(&self.head);
        self.wake_epoch.fetch_add(1, Ordering::SeqCst);
        self.item_ready.notify_all();
        self.relieved.notify_all();
    }

    /// A zero threshold belongs to a zero-capacity queue, which can never
    /// fill up and so is never saturated.
    fn is_saturated(&self) -> bool {
        let threshold = self.threshold.load(Ordering::Relaxed);
        threshold > 0 && self.size.load(Ordering::SeqCst) >= threshold
    }

    fn front_is_empty(&self, head: &NodePtr<T>) -> bool {
        // SAFETY: the head pointer always names the live dummy node.
        unsafe { (*head.0).next.load(Ordering::SeqCst).is_null() }
    }

    /// Advance the dummy by one node. Caller holds the head lock.
    fn unlink_front(&self, head: &mut NodePtr<T>) -> Option<T> {
        // SAFETY: the head pointer always names the live dummy node.
        let next = unsafe { (*head.0).next.load(Ordering::SeqCst) };
        if next.is_null() {
            return None;
        }

        let old = std::mem::replace(&mut head.0, next);
        // SAFETY: `old` has a successor, so it is not the tail and no
        // pusher can reach it; it was allocated by `Node::alloc` and is
        // freed exactly once, here.
        drop(unsafe { Box::from_raw(old) });

        // SAFETY: `next` is now the dummy. A concurrent pusher may write
        // its `next` link, but never its `value`.
        unsafe { (*next).value.take() }
    }

    /// Account for `removed` pops. Caller holds the head lock.
    fn release(&self, removed: usize) {
        if removed == 0 {
            return;
        }
        let before = self.size.fetch_sub(removed, Ordering::SeqCst);
        let threshold = self.threshold.load(Ordering::Relaxed);
        if before >= threshold && before - removed < threshold {
            self.relieved.notify_all();
        }
    }
}

impl<T> Drop for BoundedQueue<T> {
    fn drop(&mut self) {
        let mut cursor = self
            .head
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .0;
        while !cursor.is_null() {
            // SAFETY: drop has exclusive access and every node in the chain
            // came from `Node::alloc`; each is reclaimed once.
            let node = unsafe { Box::from_raw(cursor) };
            cursor = node.next.load(Ordering::Relaxed);
        }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("batch_size", &self.batch_size())
            .field("backpressure_threshold", &self.backpressure_threshold())
            .finish()
    }
}

fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
