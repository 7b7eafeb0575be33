//! Pinned worker threads with cooperative shutdown.
//!
//! A [`PinnedWorker`] spawns an OS thread, attempts to bind it to a CPU
//! core, and hands the closure a shared stop flag. Pinning failure is
//! logged and ignored — the worker still runs. Dropping the handle sets
//! the stop flag and joins.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::perf::cpu;

/// Where to pin a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorePin {
    /// Bind to this core (best-effort).
    Core(usize),
    /// Let the scheduler place the thread.
    None,
}

/// Handle to a spawned worker thread.
///
/// The worker polls the shared stop flag at its own loop boundaries;
/// `stop()` (or drop) requests exit and joins.
pub struct PinnedWorker {
    name: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PinnedWorker {
    /// Spawn a worker running `body(&stop)`.
    ///
    /// The closure is responsible for polling `stop` often enough for
    /// shutdown to be prompt (receive loops use short socket timeouts for
    /// exactly this reason). A panic inside the body is trapped, logged,
    /// and converted into a stop signal so the rest of the pipeline winds
    /// down instead of deadlocking on a dead peer.
    pub fn spawn<F>(name: &str, pin: CorePin, stop: Arc<AtomicBool>, body: F) -> Self
    where
        F: FnOnce(&AtomicBool) + Send + 'static,
    {
        let thread_stop = Arc::clone(&stop);
        let thread_name = name.to_string();

        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                if let CorePin::Core(core) = pin {
                    if let Err(e) = cpu::pin_to_core(core) {
                        tracing::warn!(worker = %thread_name, "CPU pinning unavailable: {e:#}");
                    }
                }

                let result =
                    std::panic::catch_unwind(AssertUnwindSafe(|| body(&thread_stop)));
                if result.is_err() {
                    tracing::error!(worker = %thread_name, "worker panicked, signalling stop");
                    thread_stop.store(true, Ordering::Relaxed);
                }
            })
            .expect("spawning a worker thread");

        Self {
            name: name.to_string(),
            stop,
            handle: Some(handle),
        }
    }

    /// Request shutdown and wait for the worker to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(worker = %self.name, "worker thread terminated abnormally");
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for PinnedWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    #[test]
    fn worker_runs_and_stops_on_drop() {
        let stop = Arc::new(AtomicBool::new(false));
        let iterations = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&iterations);

        let worker = PinnedWorker::spawn("spinner", CorePin::None, stop, move |stop| {
            while !stop.load(Ordering::Relaxed) {
                counter.fetch_add(1, Ordering::Relaxed);
                std::thread::sleep(Duration::from_millis(1));
            }
        });

        std::thread::sleep(Duration::from_millis(20));
        drop(worker);

        assert!(iterations.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn panic_in_worker_sets_stop_flag() {
        let stop = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&stop);

        let mut worker = PinnedWorker::spawn("doomed", CorePin::None, stop, |_stop| {
            panic!("induced failure");
        });
        worker.stop();

        assert!(observed.load(Ordering::Relaxed));
    }

    #[test]
    fn pinned_spawn_survives_unpinnable_core() {
        let stop = Arc::new(AtomicBool::new(false));
        let ran = Arc::new(AtomicBool::new(false));
        let ran_inner = Arc::clone(&ran);

        // Absurd core id: pinning fails, worker must still run.
        let mut worker =
            PinnedWorker::spawn("unpinnable", CorePin::Core(usize::MAX / 2), stop, move |_| {
                ran_inner.store(true, Ordering::Relaxed);
            });
        worker.stop();

        assert!(ran.load(Ordering::Relaxed));
    }
}
