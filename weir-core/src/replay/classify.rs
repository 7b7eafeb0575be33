//! Message-priority classification.
//!
//! Classifiers look at individual messages (and replay state) and assign a
//! [`MessagePriority`] that priority-aware rules use to let important
//! events jump flow control. Classifiers are stateful and belong to a
//! single rule on a single thread.

use std::collections::{HashMap, HashSet};

use super::state::ReplayState;
use crate::wire::{MarketDataMessage, SYMBOL_LEN};

/// Priority classes for individual messages, in ascending urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessagePriority {
    /// Subject to every rule.
    Normal = 0,
    /// Bypasses chaos rules; reduced flow-control penalties.
    Elevated = 1,
    /// Bypasses flow control and chaos.
    Critical = 2,
    /// Bypasses everything, safety included.
    Emergency = 3,
}

/// Assigns a priority to each message.
pub trait PriorityClassifier: Send {
    fn classify(
        &mut self,
        message_index: usize,
        message: &[u8],
        state: &ReplayState,
    ) -> MessagePriority;
}

/// Decode the record if it parses and is long enough; classifiers must
/// not assume well-formed input.
fn decode_record(message: &[u8]) -> Option<MarketDataMessage> {
    let size = message.first().and_then(|&t| MarketDataMessage::record_size(t))?;
    (message.len() >= size).then(|| MarketDataMessage::decode(message))
}

/// Messages for configured symbols are critical (e.g. SPY, QQQ).
#[derive(Default)]
pub struct SymbolPriorityClassifier {
    critical_symbols: HashSet<[u8; SYMBOL_LEN]>,
}

impl SymbolPriorityClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_critical_symbol(&mut self, symbol: &str) {
        self.critical_symbols.insert(crate::wire::pad_symbol(symbol));
    }
}

impl PriorityClassifier for SymbolPriorityClassifier {
    fn classify(
        &mut self,
        _index: usize,
        message: &[u8],
        _state: &ReplayState,
    ) -> MessagePriority {
        let Some(record) = decode_record(message) else {
            return MessagePriority::Normal;
        };
        match record.symbol() {
            Some(symbol) if self.critical_symbols.contains(symbol) => MessagePriority::Critical,
            _ => MessagePriority::Normal,
        }
    }
}

/// Detects rate spikes: when the instantaneous send rate runs well above
/// its smoothed average, a market move is in progress and messages are
/// elevated.
pub struct BurstDetectionClassifier {
    burst_threshold: f64,
    average_rate: f64,
}

impl BurstDetectionClassifier {
    pub fn new(burst_threshold: f64) -> Self {
        Self {
            burst_threshold,
            average_rate: 0.0,
        }
    }
}

impl Default for BurstDetectionClassifier {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl PriorityClassifier for BurstDetectionClassifier {
    fn classify(
        &mut self,
        _index: usize,
        _message: &[u8],
        state: &ReplayState,
    ) -> MessagePriority {
        let current_rate = state.current_rate() as f64;

        if self.average_rate == 0.0 {
            self.average_rate = current_rate;
            return MessagePriority::Normal;
        }

        self.average_rate = 0.9 * self.average_rate + 0.1 * current_rate;

        if current_rate > self.average_rate * self.burst_threshold {
            MessagePriority::Elevated
        } else {
            MessagePriority::Normal
        }
    }
}

/// Elevates priority during configured time windows (market open/close).
#[derive(Default)]
pub struct TimeWindowClassifier {
    windows: Vec<(f64, f64, MessagePriority)>,
}

impl TimeWindowClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `[start_ms, end_ms]` window (relative to playback start).
    pub fn add_window(&mut self, start_ms: f64, end_ms: f64, priority: MessagePriority) {
        self.windows.push((start_ms, end_ms, priority));
    }
}

impl PriorityClassifier for TimeWindowClassifier {
    fn classify(
        &mut self,
        _index: usize,
        _message: &[u8],
        state: &ReplayState,
    ) -> MessagePriority {
        let elapsed = state.elapsed_ms();
        for &(start, end, priority) in &self.windows {
            if elapsed >= start && elapsed <= end {
                return priority;
            }
        }
        MessagePriority::Normal
    }
}

/// Flags large percentage price moves as critical.
///
/// Tracks the last seen price per symbol; a move exceeding the symbol's
/// threshold (or the default) is critical. The first observation of a
/// symbol just seeds its price.
pub struct PriceMovePctClassifier {
    default_threshold_pct: f64,
    symbol_thresholds: HashMap<[u8; SYMBOL_LEN], f64>,
    last_prices: HashMap<[u8; SYMBOL_LEN], u32>,
}

impl PriceMovePctClassifier {
    pub fn new(default_threshold_pct: f64) -> Self {
        Self {
            default_threshold_pct,
            symbol_thresholds: HashMap::new(),
            last_prices: HashMap::new(),
        }
    }

    /// Override the threshold for one symbol.
    pub fn set_symbol_threshold(&mut self, symbol: &str, threshold_pct: f64) {
        self.symbol_thresholds
            .insert(crate::wire::pad_symbol(symbol), threshold_pct);
    }
}

impl PriorityClassifier for PriceMovePctClassifier {
    fn classify(
        &mut self,
        _index: usize,
        message: &[u8],
        _state: &ReplayState,
    ) -> MessagePriority {
        let Some(record) = decode_record(message) else {
            return MessagePriority::Normal;
        };
        let (Some(symbol), Some(price)) = (record.symbol(), record.price()) else {
            return MessagePriority::Normal;
        };

        let previous = self.last_prices.insert(*symbol, price);
        let Some(previous) = previous else {
            return MessagePriority::Normal;
        };
        if previous == 0 {
            return MessagePriority::Normal;
        }

        let move_pct =
            ((price as f64 - previous as f64).abs() / previous as f64) * 100.0;
        let threshold = self
            .symbol_thresholds
            .get(symbol)
            .copied()
            .unwrap_or(self.default_threshold_pct);

        if move_pct > threshold {
            MessagePriority::Critical
        } else {
            MessagePriority::Normal
        }
    }
}
