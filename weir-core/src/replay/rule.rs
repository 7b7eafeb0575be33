//! The playback rule contract.

use std::any::Any;
use std::time::Duration;

use super::state::ReplayState;

/// Rule evaluation order. Lower value runs first and outranks everything
/// after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum RulePriority {
    /// Never-violated ceilings (rate limits, system protection).
    Safety = 0,
    /// Flow shape (burst patterns, pacing).
    Control = 1,
    /// Timing adjustments (speed factor, wave).
    Timing = 2,
    /// Fault injection (packet loss, jitter).
    Chaos = 3,
}

/// What a rule decided about the current message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Pass to the next rule unchanged.
    #[default]
    Continue,
    /// Send immediately; accumulated delay is void.
    SendNow,
    /// Do not send; count as dropped. Terminal.
    Drop,
    /// Do not send; count as queued/held. Terminal, outranks Drop.
    Veto,
    /// Decision was adjusted; continue down the ladder.
    Modified,
}

impl Outcome {
    /// Terminal outcomes short-circuit the rest of the ladder.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Drop | Self::Veto)
    }
}

/// The decision threaded through the rule ladder for one message.
#[derive(Default)]
pub struct Decision {
    pub outcome: Outcome,
    /// Total delay to apply before sending (for non-terminal outcomes).
    pub accumulated_delay: Duration,
    /// Opaque side-channel between cooperating rules. Unused by the
    /// built-in rules.
    pub metadata: Option<Box<dyn Any + Send>>,
}

impl std::fmt::Debug for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decision")
            .field("outcome", &self.outcome)
            .field("accumulated_delay", &self.accumulated_delay)
            .field("metadata", &self.metadata.as_ref().map(|_| "<opaque>"))
            .finish()
    }
}

impl Decision {
    pub fn new() -> Self {
        Self::default()
    }

    /// A send-immediately decision with any pending delay cleared.
    pub fn send_now(mut self) -> Self {
        self.outcome = Outcome::SendNow;
        self.accumulated_delay = Duration::ZERO;
        self
    }
}

/// A composable playback rule.
///
/// Rules own their mutable state (burst counters, RNGs, smoothed
/// averages); the engine owns the rules. `apply` observes the decision
/// made so far and returns the next one.
pub trait PlaybackRule: Send {
    /// Evaluation tier for this rule.
    fn priority(&self) -> RulePriority;

    /// Evaluate one message.
    fn apply(
        &mut self,
        message_index: usize,
        message: &[u8],
        state: &ReplayState,
        decision: Decision,
    ) -> Decision;

    /// Called once when the rule is added to an engine.
    fn initialize(&mut self) {}

    /// Called at the start of each playback run.
    fn on_playback_start(&mut self) {}

    /// Called at the end of each playback run.
    fn on_playback_end(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_safety_first() {
        assert!(RulePriority::Safety < RulePriority::Control);
        assert!(RulePriority::Control < RulePriority::Timing);
        assert!(RulePriority::Timing < RulePriority::Chaos);
    }

    #[test]
    fn terminal_outcomes() {
        assert!(Outcome::Drop.is_terminal());
        assert!(Outcome::Veto.is_terminal());
        assert!(!Outcome::Continue.is_terminal());
        assert!(!Outcome::SendNow.is_terminal());
        assert!(!Outcome::Modified.is_terminal());
    }

    #[test]
    fn send_now_clears_delay() {
        let decision = Decision {
            outcome: Outcome::Modified,
            accumulated_delay: Duration::from_micros(500),
            metadata: None,
        };
        let decision = decision.send_now();
        assert_eq!(decision.outcome, Outcome::SendNow);
        assert_eq!(decision.accumulated_delay, Duration::ZERO);
    }
}
