//! Common initialization for all binaries.

use anyhow::Result;

/// Initialize tracing with the given default level (`RUST_LOG` wins).
pub fn init_logging(level: &str) {
    weir_core::utils::logger::init_logger(level, false);
}

/// Best-effort performance setup: optional pinning of the main thread and
/// optional real-time priority.
pub fn setup_performance(cpu_core: Option<usize>, realtime: bool) -> Result<()> {
    if let Some(core) = cpu_core {
        weir_core::perf::pin_to_core(core)?;
    }

    #[cfg(target_os = "linux")]
    if realtime {
        weir_core::perf::set_realtime_priority(50)?;
    }

    #[cfg(not(target_os = "linux"))]
    if realtime {
        tracing::warn!("real-time priority only supported on Linux");
    }

    Ok(())
}
