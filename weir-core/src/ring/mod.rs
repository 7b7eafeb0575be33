//! Lock-free single-producer / single-consumer ring buffers
//!
//! The ring is the only conduit between pipeline threads: the UDP receiver
//! feeds the trading thread through one, the execution-report receiver
//! through another. Capacity is fixed at construction, there is no blocking
//! push, and a full ring drops (and counts) rather than stalls.

mod spsc;

pub use spsc::SpscRing;

/// Default capacity used when a caller has no better number.
pub const DEFAULT_RING_CAPACITY: usize = 1024;
