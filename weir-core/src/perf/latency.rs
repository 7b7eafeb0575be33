//! Tick-to-trade latency tracking.
//!
//! The hot path records raw counter deltas into a preallocated buffer —
//! no allocation, no locks, no conversion. Statistics (percentiles, mean)
//! are computed offline from a sorted copy of the samples.
//!
//! Timestamps come from the highest-resolution monotonic counter available:
//! `rdtsc` on x86_64, the monotonic clock elsewhere. Conversion to
//! microseconds uses a one-time calibration that measures the counter's
//! tick rate over a 100 ms busy wait against `Instant`.

use std::sync::OnceLock;
use std::time::Instant;

/// Raw timestamp from [`HighResClock::now`]. Counter ticks on x86_64,
/// nanoseconds elsewhere.
pub type Timestamp = u64;

static TICKS_PER_US: OnceLock<f64> = OnceLock::new();

/// High-resolution monotonic clock.
pub struct HighResClock;

impl HighResClock {
    /// Current raw timestamp. Roughly 20 cycles on x86_64.
    #[inline(always)]
    pub fn now() -> Timestamp {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            core::arch::x86_64::_rdtsc()
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            monotonic_nanos()
        }
    }

    /// Convert a raw delta to microseconds using the cached calibration.
    ///
    /// The first call pays the 100 ms calibration cost; call
    /// [`HighResClock::calibrate`] once at startup to keep that off the
    /// measurement path.
    #[inline]
    pub fn to_micros(delta: Timestamp) -> f64 {
        delta as f64 / *TICKS_PER_US.get_or_init(Self::measure_tick_rate)
    }

    /// Force calibration now (idempotent).
    pub fn calibrate() {
        let _ = TICKS_PER_US.get_or_init(Self::measure_tick_rate);
    }

    /// Measure counter ticks per microsecond over a 100 ms busy wait
    /// against the monotonic wall clock.
    fn measure_tick_rate() -> f64 {
        #[cfg(target_arch = "x86_64")]
        {
            let start_ticks = Self::now();
            let start = Instant::now();
            while start.elapsed().as_millis() < 100 {
                std::hint::spin_loop();
            }
            let elapsed_ns = start.elapsed().as_nanos() as f64;
            let ticks = (Self::now() - start_ticks) as f64;
            (ticks / elapsed_ns) * 1_000.0
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            // Counter is already nanoseconds.
            1_000.0
        }
    }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn monotonic_nanos() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Offline summary of recorded latencies, in microseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencyStats {
    /// Total events recorded (may exceed `samples_recorded` on overflow).
    pub count: u64,
    /// Samples actually stored.
    pub samples_recorded: u64,
    pub min_us: f64,
    pub max_us: f64,
    pub mean_us: f64,
    pub median_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub p999_us: f64,
}

/// Fixed-capacity latency sampler.
///
/// `record` and `record_delta` are the hot path: a bounds check, a store,
/// and a counter increment. Once the buffer is full, further events still
/// increment `count` but the samples are discarded silently — visible as
/// `samples_recorded < count` in [`LatencyTracker::stats`].
pub struct LatencyTracker {
    samples: Vec<Timestamp>,
    capacity: usize,
    count: u64,
}

impl LatencyTracker {
    /// Default sample capacity (one million samples, 8 MiB).
    pub const DEFAULT_CAPACITY: usize = 1_000_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Preallocates the whole sample buffer up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            count: 0,
        }
    }

    /// Record a start/end timestamp pair.
    #[inline(always)]
    pub fn record(&mut self, start: Timestamp, end: Timestamp) {
        self.record_delta(end.wrapping_sub(start));
    }

    /// Record a raw delta directly.
    #[inline(always)]
    pub fn record_delta(&mut self, delta: Timestamp) {
        if self.samples.len() < self.capacity {
            self.samples.push(delta);
        }
        self.count += 1;
    }

    /// Total events, including any whose samples were discarded.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// True once additional samples are being discarded.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Discard all samples and reset the event count.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.count = 0;
    }

    /// Compute summary statistics. Sorts a copy; call offline.
    pub fn stats(&self) -> LatencyStats {
        let mut stats = LatencyStats {
            count: self.count,
            samples_recorded: self.samples.len() as u64,
            ..Default::default()
        };

        if self.samples.is_empty() {
            return stats;
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let n = sorted.len();

        stats.min_us = HighResClock::to_micros(sorted[0]);
        stats.max_us = HighResClock::to_micros(sorted[n - 1]);

        let sum: u128 = sorted.iter().map(|&s| s as u128).sum();
        stats.mean_us = HighResClock::to_micros((sum / n as u128) as u64);

        let percentile = |p: f64| -> f64 {
            let idx = ((p * n as f64) as usize).min(n - 1);
            HighResClock::to_micros(sorted[idx])
        };
        stats.median_us = percentile(0.50);
        stats.p95_us = percentile(0.95);
        stats.p99_us = percentile(0.99);
        stats.p999_us = percentile(0.999);

        stats
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that records the latency of its enclosing scope.
pub struct ScopedLatency<'a> {
    tracker: &'a mut LatencyTracker,
    start: Timestamp,
}

impl<'a> ScopedLatency<'a> {
    pub fn new(tracker: &'a mut LatencyTracker) -> Self {
        Self {
            tracker,
            start: HighResClock::now(),
        }
    }
}

impl Drop for ScopedLatency<'_> {
    fn drop(&mut self) {
        let end = HighResClock::now();
        self.tracker.record(self.start, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_deltas_and_counts() {
        let mut tracker = LatencyTracker::with_capacity(16);
        tracker.record_delta(100);
        tracker.record_delta(200);
        tracker.record(500, 800);

        let stats = tracker.stats();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.samples_recorded, 3);
    }

    #[test]
    fn overflow_discards_samples_but_counts_events() {
        let mut tracker = LatencyTracker::with_capacity(4);
        for i in 0..10 {
            tracker.record_delta(i);
        }
        let stats = tracker.stats();
        assert_eq!(stats.count, 10);
        assert_eq!(stats.samples_recorded, 4);
        assert!(tracker.is_full());
    }

    #[test]
    fn percentiles_are_ordered() {
        let mut tracker = LatencyTracker::with_capacity(1024);
        // Spread of deltas; exact values do not matter, ordering does.
        for i in 1..=1000u64 {
            tracker.record_delta(i * 37 % 997 + 1);
        }
        let s = tracker.stats();
        assert!(s.min_us <= s.median_us);
        assert!(s.median_us <= s.p95_us);
        assert!(s.p95_us <= s.p99_us);
        assert!(s.p99_us <= s.p999_us);
        assert!(s.p999_us <= s.max_us);
    }

    #[test]
    fn empty_tracker_stats_are_zero() {
        let tracker = LatencyTracker::with_capacity(8);
        let s = tracker.stats();
        assert_eq!(s.count, 0);
        assert_eq!(s.samples_recorded, 0);
        assert_eq!(s.min_us, 0.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut tracker = LatencyTracker::with_capacity(8);
        tracker.record_delta(42);
        tracker.reset();
        assert_eq!(tracker.count(), 0);
        assert_eq!(tracker.stats().samples_recorded, 0);
    }

    #[test]
    fn scoped_latency_records_one_sample() {
        let mut tracker = LatencyTracker::with_capacity(8);
        {
            let _guard = ScopedLatency::new(&mut tracker);
            std::hint::spin_loop();
        }
        assert_eq!(tracker.count(), 1);
    }
}
