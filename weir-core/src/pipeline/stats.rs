//! Shared observability counters for the pipeline.
//!
//! One explicit handle passed to every worker instead of module globals.
//! Counters sit on separate cache lines so the receive threads do not
//! bounce a line between cores on every increment; all accesses are
//! relaxed — these are statistics, not synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

#[repr(C, align(64))]
struct PaddedCounter {
    value: AtomicU64,
}

impl PaddedCounter {
    const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    #[inline(always)]
    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Relaxed atomic counters shared by the pipeline workers.
pub struct PipelineStats {
    md_received: PaddedCounter,
    md_processed: PaddedCounter,
    orders_sent: PaddedCounter,
    execs_received: PaddedCounter,
}

impl PipelineStats {
    pub const fn new() -> Self {
        Self {
            md_received: PaddedCounter::new(),
            md_processed: PaddedCounter::new(),
            orders_sent: PaddedCounter::new(),
            execs_received: PaddedCounter::new(),
        }
    }

    #[inline(always)]
    pub fn add_md_received(&self, n: u64) {
        self.md_received.add(n);
    }

    #[inline(always)]
    pub fn inc_md_processed(&self) {
        self.md_processed.add(1);
    }

    #[inline(always)]
    pub fn inc_orders_sent(&self) {
        self.orders_sent.add(1);
    }

    #[inline(always)]
    pub fn inc_execs_received(&self) {
        self.execs_received.add(1);
    }

    pub fn md_received(&self) -> u64 {
        self.md_received.get()
    }

    pub fn md_processed(&self) -> u64 {
        self.md_processed.get()
    }

    pub fn orders_sent(&self) -> u64 {
        self.orders_sent.get()
    }

    pub fn execs_received(&self) -> u64 {
        self.execs_received.get()
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}
