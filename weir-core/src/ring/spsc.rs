//! Cache-line optimized SPSC ring buffer.
//!
//! One thread pushes, one thread pops. Only the producer ever stores `head`,
//! only the consumer ever stores `tail`. The buffer uses the classic
//! one-slot sentinel: `N` slots hold at most `N - 1` items, `head == tail`
//! means empty and `(head + 1) % N == tail` means full.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Pads an atomic index onto its own cache line so the producer's `head`
/// and the consumer's `tail` never cause false sharing.
#[repr(C, align(64))]
struct PaddedIndex {
    value: AtomicUsize,
}

impl PaddedIndex {
    const fn new() -> Self {
        Self {
            value: AtomicUsize::new(0),
        }
    }
}

/// Lock-free, fixed-capacity ring buffer for a single producer and a single
/// consumer.
///
/// The ring itself is shared (typically via `Arc`); the SPSC contract is a
/// usage contract: exactly one thread may call [`SpscRing::try_push`] and
/// exactly one thread may call [`SpscRing::try_pop`]. The pipeline builder
/// owns the rings and hands each end to exactly one worker.
///
/// A full ring never blocks: `try_push` returns `false` and increments the
/// `dropped` counter. The high-water mark records the fullest the ring has
/// ever been.
pub struct SpscRing<T, const N: usize> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    head: PaddedIndex,
    tail: PaddedIndex,
    dropped: AtomicUsize,
    high_water_mark: AtomicUsize,
}

// The slots are only ever accessed by the producer (before publishing) or
// the consumer (after observing the publication), so sharing the ring is
// safe whenever the element type can move between threads.
unsafe impl<T: Send, const N: usize> Send for SpscRing<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for SpscRing<T, N> {}

impl<T, const N: usize> SpscRing<T, N> {
    /// Create an empty ring. `N` must be at least 2 (one slot is the
    /// empty/full sentinel).
    pub fn new() -> Self {
        assert!(N >= 2, "ring capacity must be at least 2");
        let mut buffer = Vec::with_capacity(N);
        for _ in 0..N {
            buffer.push(UnsafeCell::new(MaybeUninit::uninit()));
        }
        Self {
            buffer: buffer.into_boxed_slice(),
            head: PaddedIndex::new(),
            tail: PaddedIndex::new(),
            dropped: AtomicUsize::new(0),
            high_water_mark: AtomicUsize::new(0),
        }
    }

    /// Attempt to push an item. Returns `false` (and counts a drop) if the
    /// ring is full. Producer thread only.
    #[inline]
    pub fn try_push(&self, item: T) -> bool {
        let head = self.head.value.load(Ordering::Relaxed);
        let next = Self::increment(head);

        if next == self.tail.value.load(Ordering::Acquire) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // The slot at `head` is unreachable by the consumer until the
        // release store below publishes it.
        unsafe {
            (*self.buffer[head].get()).write(item);
        }
        self.head.value.store(next, Ordering::Release);

        self.update_high_water_mark(next);
        true
    }

    /// Attempt to pop an item. Returns `None` when the ring is empty.
    /// Consumer thread only.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        let tail = self.tail.value.load(Ordering::Relaxed);
        if tail == self.head.value.load(Ordering::Acquire) {
            return None;
        }

        // The acquire load above synchronizes with the producer's release
        // store, so the slot at `tail` is fully written.
        let item = unsafe { (*self.buffer[tail].get()).assume_init_read() };
        self.tail.value.store(Self::increment(tail), Ordering::Release);
        Some(item)
    }

    /// Total items lost to a full ring. Monotonically non-decreasing.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The fullest the ring has ever been. Monotonically non-decreasing,
    /// never exceeds `N - 1`.
    #[inline]
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark.load(Ordering::Relaxed)
    }

    /// Approximate number of items currently queued.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.value.load(Ordering::Acquire);
        let tail = self.tail.value.load(Ordering::Acquire);
        (head + N - tail) % N
    }

    /// True when no items are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of items the ring can hold (`N - 1` with the
    /// one-slot sentinel).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    #[inline(always)]
    fn increment(idx: usize) -> usize {
        (idx + 1) % N
    }

    /// Raise the high-water mark if the current fill level exceeds it.
    /// Relaxed CAS loop: the mark is observability only.
    fn update_high_water_mark(&self, head: usize) {
        let used = (head + N - self.tail.value.load(Ordering::Relaxed)) % N;
        let mut current = self.high_water_mark.load(Ordering::Relaxed);
        while used > current {
            match self.high_water_mark.compare_exchange_weak(
                current,
                used,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

impl<T, const N: usize> Default for SpscRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Drop for SpscRing<T, N> {
    fn drop(&mut self) {
        // Drain whatever the consumer never took so non-Copy payloads
        // are not leaked.
        while self.try_pop().is_some() {}
    }
}
