//! Running counters and rate estimation for a replay session.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Mutable replay bookkeeping.
///
/// Only the replayer thread mutates this; rules observe it through a
/// shared reference. The instantaneous rate is the number of sends in the
/// trailing second, maintained as a sliding window of send timestamps.
pub struct ReplayState {
    start_time: Instant,
    messages_sent: usize,
    total_messages_sent: usize,
    messages_dropped: usize,
    messages_queued: usize,
    recent_sends: VecDeque<Instant>,
}

impl ReplayState {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            messages_sent: 0,
            total_messages_sent: 0,
            messages_dropped: 0,
            messages_queued: 0,
            recent_sends: VecDeque::new(),
        }
    }

    /// Record a successful send and refresh the sliding window.
    pub fn record_sent(&mut self) {
        self.messages_sent += 1;
        self.total_messages_sent += 1;

        let now = Instant::now();
        self.recent_sends.push_back(now);

        // Instants before the clock's epoch are unrepresentable; nothing
        // to trim in that case.
        if let Some(one_second_ago) = now.checked_sub(Duration::from_secs(1)) {
            while self
                .recent_sends
                .front()
                .is_some_and(|&t| t < one_second_ago)
            {
                self.recent_sends.pop_front();
            }
        }
    }

    pub fn record_dropped(&mut self) {
        self.messages_dropped += 1;
    }

    pub fn record_queued(&mut self) {
        self.messages_queued += 1;
    }

    /// Sends in the trailing second.
    pub fn current_rate(&self) -> usize {
        self.recent_sends.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1_000.0
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn total_sent(&self) -> usize {
        self.total_messages_sent
    }

    /// Sends since the last [`ReplayState::reset`].
    pub fn messages_sent(&self) -> usize {
        self.messages_sent
    }

    pub fn messages_dropped(&self) -> usize {
        self.messages_dropped
    }

    pub fn messages_queued(&self) -> usize {
        self.messages_queued
    }

    /// Reset per-interval counters. The total and the start time persist.
    pub fn reset(&mut self) {
        self.messages_sent = 0;
        self.messages_dropped = 0;
        self.messages_queued = 0;
    }
}

impl Default for ReplayState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut state = ReplayState::new();
        state.record_sent();
        state.record_sent();
        state.record_dropped();
        state.record_queued();

        assert_eq!(state.messages_sent(), 2);
        assert_eq!(state.total_sent(), 2);
        assert_eq!(state.messages_dropped(), 1);
        assert_eq!(state.messages_queued(), 1);
    }

    #[test]
    fn rate_counts_recent_sends() {
        let mut state = ReplayState::new();
        for _ in 0..50 {
            state.record_sent();
        }
        // All sends happened within the last second.
        assert_eq!(state.current_rate(), 50);
    }

    #[test]
    fn reset_keeps_total() {
        let mut state = ReplayState::new();
        state.record_sent();
        state.record_dropped();
        state.reset();

        assert_eq!(state.messages_sent(), 0);
        assert_eq!(state.messages_dropped(), 0);
        assert_eq!(state.total_sent(), 1);
    }

    #[test]
    fn elapsed_moves_forward() {
        let state = ReplayState::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(state.elapsed_ms() >= 5.0);
    }
}
