//! Priority-aware flow-control rules.
//!
//! These rules consult a [`PriorityClassifier`] and relax (or sharpen)
//! their behaviour by message priority: critical market events punch
//! through rate limits and burst windows that would hold back routine
//! traffic.

use std::time::{Duration, Instant};

use super::classify::{MessagePriority, PriorityClassifier};
use super::rule::{Decision, Outcome, PlaybackRule, RulePriority};
use super::state::ReplayState;

/// Rate limit that only binds normal traffic.
///
/// Critical and Emergency messages pass untouched. Elevated messages get
/// half the standard backoff. Normal messages over the limit are vetoed
/// (held), not delayed.
pub struct PriorityAwareRateLimitRule {
    max_rate: usize,
    classifier: Box<dyn PriorityClassifier>,
}

impl PriorityAwareRateLimitRule {
    pub fn new(max_rate: usize, classifier: Box<dyn PriorityClassifier>) -> Self {
        Self {
            max_rate: max_rate.max(1),
            classifier,
        }
    }
}

impl PlaybackRule for PriorityAwareRateLimitRule {
    fn priority(&self) -> RulePriority {
        RulePriority::Safety
    }

    fn apply(
        &mut self,
        index: usize,
        message: &[u8],
        state: &ReplayState,
        mut decision: Decision,
    ) -> Decision {
        let message_priority = self.classifier.classify(index, message, state);

        if message_priority >= MessagePriority::Critical {
            return decision;
        }

        if state.current_rate() >= self.max_rate {
            if message_priority == MessagePriority::Elevated {
                decision.accumulated_delay +=
                    Duration::from_micros(500_000 / self.max_rate as u64);
                decision.outcome = Outcome::Modified;
            } else {
                decision.outcome = Outcome::Veto;
            }
        }

        decision
    }
}

/// Burst pacing that critical messages can break out of.
///
/// Critical and Emergency messages are sent immediately regardless of the
/// burst window. Elevated messages wait half the remaining window. Normal
/// messages follow standard burst semantics.
pub struct PriorityAwareBurstRule {
    burst_size: usize,
    burst_interval: Duration,
    messages_in_burst: usize,
    last_burst_time: Instant,
    classifier: Box<dyn PriorityClassifier>,
}

impl PriorityAwareBurstRule {
    pub fn new(
        burst_size: usize,
        burst_interval: Duration,
        classifier: Box<dyn PriorityClassifier>,
    ) -> Self {
        Self {
            burst_size,
            burst_interval,
            messages_in_burst: 0,
            last_burst_time: Instant::now(),
            classifier,
        }
    }
}

impl PlaybackRule for PriorityAwareBurstRule {
    fn priority(&self) -> RulePriority {
        RulePriority::Control
    }

    fn on_playback_start(&mut self) {
        self.last_burst_time = Instant::now();
        self.messages_in_burst = 0;
    }

    fn apply(
        &mut self,
        index: usize,
        message: &[u8],
        state: &ReplayState,
        decision: Decision,
    ) -> Decision {
        let message_priority = self.classifier.classify(index, message, state);

        if message_priority >= MessagePriority::Critical {
            return decision.send_now();
        }

        if self.messages_in_burst < self.burst_size {
            self.messages_in_burst += 1;
            return decision.send_now();
        }

        let elapsed = self.last_burst_time.elapsed();
        if elapsed >= self.burst_interval {
            self.messages_in_burst = 1;
            self.last_burst_time = Instant::now();
            return decision.send_now();
        }

        let mut wait = self.burst_interval - elapsed;
        if message_priority == MessagePriority::Elevated {
            wait /= 2;
        }

        let mut decision = decision;
        decision.accumulated_delay += wait;
        decision.outcome = Outcome::Modified;
        decision
    }
}
