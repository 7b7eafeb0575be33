//! The rules engine: evaluates the rule ladder for each message.

use super::rule::{Decision, PlaybackRule, RulePriority};
use super::state::ReplayState;

/// Owns the rule set and threads a [`Decision`] through it per message.
///
/// Rules are kept sorted by [`RulePriority`] — Safety first — with
/// insertion order preserved among equals. A terminal outcome (`Drop`,
/// `Veto`) stops evaluation, so nothing downstream can override it.
#[derive(Default)]
pub struct RulesEngine {
    rules: Vec<Box<dyn PlaybackRule>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, initialize it, and re-sort the ladder.
    pub fn add_rule(&mut self, mut rule: Box<dyn PlaybackRule>) {
        rule.initialize();
        self.rules.push(rule);
        // Stable sort keeps insertion order for equal priorities.
        self.rules.sort_by_key(|r| r.priority());
    }

    /// Evaluate the ladder for one message.
    pub fn evaluate(
        &mut self,
        message_index: usize,
        message: &[u8],
        state: &ReplayState,
    ) -> Decision {
        let mut decision = Decision::new();

        for rule in &mut self.rules {
            decision = rule.apply(message_index, message, state, decision);
            if decision.outcome.is_terminal() {
                break;
            }
        }

        decision
    }

    pub fn notify_playback_start(&mut self) {
        for rule in &mut self.rules {
            rule.on_playback_start();
        }
    }

    pub fn notify_playback_end(&mut self) {
        for rule in &mut self.rules {
            rule.on_playback_end();
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Priorities in evaluation order, for logging and tests.
    pub fn priorities(&self) -> Vec<RulePriority> {
        self.rules.iter().map(|r| r.priority()).collect()
    }
}
