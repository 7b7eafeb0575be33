//! The standard playback rules.
//!
//! Control: [`BurstRule`], [`ContinuousRule`]. Timing: [`SpeedFactorRule`],
//! [`WaveRule`]. Safety: [`RateLimitRule`]. Chaos: [`PacketLossRule`],
//! [`JitterRule`].

use std::f64::consts::PI;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::rule::{Decision, Outcome, PlaybackRule, RulePriority};
use super::state::ReplayState;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Send `burst_size` messages immediately, then pause until the interval
/// since the burst started has elapsed.
pub struct BurstRule {
    burst_size: usize,
    burst_interval: Duration,
    messages_in_burst: usize,
    last_burst_time: Instant,
}

impl BurstRule {
    pub fn new(burst_size: usize, burst_interval: Duration) -> Self {
        Self {
            burst_size,
            burst_interval,
            messages_in_burst: 0,
            last_burst_time: Instant::now(),
        }
    }
}

impl PlaybackRule for BurstRule {
    fn priority(&self) -> RulePriority {
        RulePriority::Control
    }

    fn on_playback_start(&mut self) {
        self.last_burst_time = Instant::now();
        self.messages_in_burst = 0;
    }

    fn apply(
        &mut self,
        _index: usize,
        _message: &[u8],
        _state: &ReplayState,
        decision: Decision,
    ) -> Decision {
        if self.messages_in_burst < self.burst_size {
            self.messages_in_burst += 1;
            return decision.send_now();
        }

        let elapsed = self.last_burst_time.elapsed();
        if elapsed >= self.burst_interval {
            // Window expired; this message opens the next burst.
            self.messages_in_burst = 1;
            self.last_burst_time = Instant::now();
            return decision.send_now();
        }

        let mut decision = decision;
        decision.accumulated_delay += self.burst_interval - elapsed;
        decision.outcome = Outcome::Modified;
        decision
    }
}

/// Fixed-rate pacing: each message adds `1s / rate` of delay.
pub struct ContinuousRule {
    delay_between_messages: Duration,
}

impl ContinuousRule {
    pub fn new(messages_per_second: usize) -> Self {
        Self {
            delay_between_messages: Duration::from_micros(
                (MICROS_PER_SEC / messages_per_second.max(1) as f64) as u64,
            ),
        }
    }
}

impl PlaybackRule for ContinuousRule {
    fn priority(&self) -> RulePriority {
        RulePriority::Control
    }

    fn apply(
        &mut self,
        _index: usize,
        _message: &[u8],
        _state: &ReplayState,
        mut decision: Decision,
    ) -> Decision {
        decision.accumulated_delay += self.delay_between_messages;
        decision.outcome = Outcome::Modified;
        decision
    }
}

/// Scales the accumulated delay: factor 2 halves every delay.
pub struct SpeedFactorRule {
    speed_factor: f64,
}

impl SpeedFactorRule {
    pub fn new(speed_factor: f64) -> Self {
        Self { speed_factor }
    }
}

impl PlaybackRule for SpeedFactorRule {
    fn priority(&self) -> RulePriority {
        RulePriority::Timing
    }

    fn apply(
        &mut self,
        _index: usize,
        _message: &[u8],
        _state: &ReplayState,
        mut decision: Decision,
    ) -> Decision {
        if !decision.accumulated_delay.is_zero() && self.speed_factor > 0.0 {
            decision.accumulated_delay =
                Duration::from_secs_f64(decision.accumulated_delay.as_secs_f64() / self.speed_factor);
            decision.outcome = Outcome::Modified;
        }
        decision
    }
}

/// Rate oscillates sinusoidally between `min_rate` and `max_rate` over
/// `period`.
pub struct WaveRule {
    period: Duration,
    min_rate: usize,
    max_rate: usize,
}

impl WaveRule {
    pub fn new(period: Duration, min_rate: usize, max_rate: usize) -> Self {
        Self {
            period,
            min_rate,
            max_rate,
        }
    }
}

impl PlaybackRule for WaveRule {
    fn priority(&self) -> RulePriority {
        RulePriority::Timing
    }

    fn apply(
        &mut self,
        _index: usize,
        _message: &[u8],
        state: &ReplayState,
        mut decision: Decision,
    ) -> Decision {
        let elapsed_ms = state.elapsed_ms();
        let phase = (elapsed_ms / self.period.as_millis().max(1) as f64) * 2.0 * PI;
        let rate = self.min_rate as f64
            + (self.max_rate - self.min_rate) as f64 * (phase.sin() + 1.0) / 2.0;

        decision.accumulated_delay += Duration::from_micros((MICROS_PER_SEC / rate.max(1.0)) as u64);
        decision.outcome = Outcome::Modified;
        decision
    }
}

/// Safety ceiling: once the trailing-second rate reaches the limit, each
/// message backs off by `1s / max_rate`.
pub struct RateLimitRule {
    max_rate: usize,
}

impl RateLimitRule {
    pub fn new(max_messages_per_second: usize) -> Self {
        Self {
            max_rate: max_messages_per_second.max(1),
        }
    }
}

impl PlaybackRule for RateLimitRule {
    fn priority(&self) -> RulePriority {
        RulePriority::Safety
    }

    fn apply(
        &mut self,
        _index: usize,
        _message: &[u8],
        state: &ReplayState,
        mut decision: Decision,
    ) -> Decision {
        if state.current_rate() >= self.max_rate {
            decision.accumulated_delay +=
                Duration::from_micros((MICROS_PER_SEC as u64) / self.max_rate as u64);
            decision.outcome = Outcome::Modified;
        }
        decision
    }
}

/// Chaos: drop each message with probability `loss_rate`.
pub struct PacketLossRule {
    loss_rate: f64,
    rng: StdRng,
}

impl PacketLossRule {
    pub fn new(loss_rate: f64) -> Self {
        Self {
            loss_rate,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(loss_rate: f64, seed: u64) -> Self {
        Self {
            loss_rate,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PlaybackRule for PacketLossRule {
    fn priority(&self) -> RulePriority {
        RulePriority::Chaos
    }

    fn apply(
        &mut self,
        _index: usize,
        _message: &[u8],
        _state: &ReplayState,
        mut decision: Decision,
    ) -> Decision {
        // A higher-priority hold is not downgraded into a drop.
        if decision.outcome == Outcome::Veto {
            return decision;
        }
        if self.rng.gen::<f64>() < self.loss_rate {
            decision.outcome = Outcome::Drop;
        }
        decision
    }
}

/// Chaos: add uniform random delay in `[0, max_jitter]`.
pub struct JitterRule {
    max_jitter: Duration,
    rng: StdRng,
}

impl JitterRule {
    pub fn new(max_jitter: Duration) -> Self {
        Self {
            max_jitter,
            rng: StdRng::from_entropy(),
        }
    }
}

impl PlaybackRule for JitterRule {
    fn priority(&self) -> RulePriority {
        RulePriority::Chaos
    }

    fn apply(
        &mut self,
        _index: usize,
        _message: &[u8],
        _state: &ReplayState,
        mut decision: Decision,
    ) -> Decision {
        let jitter_us = self.rng.gen_range(0..=self.max_jitter.as_micros() as u64);
        decision.accumulated_delay += Duration::from_micros(jitter_us);
        decision.outcome = Outcome::Modified;
        decision
    }
}
