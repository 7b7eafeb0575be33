//! CPU affinity and thread priority utilities.
//!
//! Pinning the receive and trading threads to dedicated cores prevents the
//! OS from migrating them, which would otherwise show up as latency spikes
//! from cache evictions. Both facilities are best-effort: on platforms (or
//! under permissions) where they are unavailable, callers log and continue.

use anyhow::Result;
use core_affinity::CoreId;

/// Pin the current thread to a specific CPU core.
///
/// Returns an error if the platform refuses the request; callers treat
/// failure as non-fatal.
pub fn pin_to_core(core: usize) -> Result<()> {
    let core_id = CoreId { id: core };

    if core_affinity::set_for_current(core_id) {
        tracing::info!("pinned thread to CPU core {}", core);
        Ok(())
    } else {
        anyhow::bail!("failed to pin thread to core {}", core)
    }
}

/// Set real-time scheduling for the current thread (Linux only).
///
/// Requires CAP_SYS_NICE or root. Uses SCHED_FIFO.
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> Result<()> {
    use libc::{sched_param, sched_setscheduler, SCHED_FIFO};

    unsafe {
        let param = sched_param {
            sched_priority: priority,
        };

        if sched_setscheduler(0, SCHED_FIFO, &param) == 0 {
            tracing::info!("set thread priority to SCHED_FIFO:{}", priority);
            Ok(())
        } else {
            anyhow::bail!("failed to set thread priority (may need CAP_SYS_NICE or root)")
        }
    }
}

/// No-op on non-Linux platforms.
#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> Result<()> {
    tracing::warn!("real-time priority setting not supported on this platform");
    Ok(())
}

/// Number of CPU cores visible to the process.
pub fn num_cores() -> usize {
    core_affinity::get_core_ids().map(|ids| ids.len()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_cores() {
        assert!(num_cores() > 0);
    }

    #[test]
    fn test_pin_to_core_does_not_panic() {
        // Pinning may be refused (macOS, restricted containers); it must
        // fail with an error rather than panic.
        let _ = pin_to_core(0);
    }
}
