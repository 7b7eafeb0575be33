//! Performance utilities: CPU pinning, pinned workers, latency tracking.

pub mod cpu;
pub mod latency;
pub mod worker;

pub use cpu::{num_cores, pin_to_core, set_realtime_priority};
pub use latency::{HighResClock, LatencyStats, LatencyTracker, ScopedLatency};
pub use worker::{CorePin, PinnedWorker};

/// Hint to the CPU that the caller is in a busy-wait spin loop.
#[inline(always)]
pub fn cpu_pause() {
    std::hint::spin_loop();
}
