//! Market-data replay: state tracking, the rules pipeline, and the
//! replayer that drives a capture through it.
//!
//! Rules are evaluated in priority order — Safety, then Control, Timing,
//! Chaos — and thread a single [`Decision`] per message. Terminal outcomes
//! (`Drop`, `Veto`) short-circuit the rest of the ladder, so a safety
//! rule's verdict can never be overturned by a chaos rule.

mod classify;
mod engine;
mod priority_rules;
mod replayer;
mod rule;
mod rules;
mod state;

pub use classify::{
    BurstDetectionClassifier, MessagePriority, PriceMovePctClassifier, PriorityClassifier,
    SymbolPriorityClassifier, TimeWindowClassifier,
};
pub use engine::RulesEngine;
pub use priority_rules::{PriorityAwareBurstRule, PriorityAwareRateLimitRule};
pub use replayer::Replayer;
pub use rule::{Decision, Outcome, PlaybackRule, RulePriority};
pub use rules::{
    BurstRule, ContinuousRule, JitterRule, PacketLossRule, RateLimitRule, SpeedFactorRule,
    WaveRule,
};
pub use state::ReplayState;
