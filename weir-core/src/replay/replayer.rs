//! The replayer: drives a loaded capture through the rules engine and a
//! sender.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use super::engine::RulesEngine;
use super::rule::{Outcome, PlaybackRule};
use super::state::ReplayState;
use crate::feed::Capture;
use crate::net::Sender;

/// How often progress is reported, in messages.
const PROGRESS_INTERVAL: usize = 10_000;

/// Replays a capture file through the rules ladder to a [`Sender`].
///
/// There is no back-pressure from the sender: a failed send is counted as
/// not-sent and the loop moves on.
pub struct Replayer {
    capture: Option<Capture>,
    engine: RulesEngine,
    state: ReplayState,
    sender: Box<dyn Sender>,
    loop_forever: bool,
}

impl Replayer {
    pub fn new(sender: Box<dyn Sender>) -> Self {
        Self {
            capture: None,
            engine: RulesEngine::new(),
            state: ReplayState::new(),
            sender,
            loop_forever: false,
        }
    }

    /// Load (and fully validate) a capture file.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let capture = Capture::load(path).context("loading capture for replay")?;
        self.capture = Some(capture);
        Ok(())
    }

    pub fn add_rule(&mut self, rule: Box<dyn PlaybackRule>) {
        self.engine.add_rule(rule);
    }

    /// Replay the file again from the top when it ends.
    pub fn set_loop_forever(&mut self, loop_forever: bool) {
        self.loop_forever = loop_forever;
    }

    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    pub fn sender(&self) -> &dyn Sender {
        self.sender.as_ref()
    }

    /// Run the playback to completion (or forever, if configured).
    pub fn run(&mut self) -> Result<()> {
        let capture = self
            .capture
            .as_ref()
            .context("no capture loaded; call load() first")?;

        let total = capture.len();
        tracing::info!(
            file = %capture.path().display(),
            messages = total,
            rules = self.engine.rule_count(),
            loop_forever = self.loop_forever,
            "replay starting"
        );

        self.state = ReplayState::new();
        self.engine.notify_playback_start();
        let started = Instant::now();

        loop {
            for i in 0..total {
                let message = capture.record(i);
                let decision = self.engine.evaluate(i, message, &self.state);

                match decision.outcome {
                    Outcome::Drop => self.state.record_dropped(),
                    Outcome::Veto => self.state.record_queued(),
                    Outcome::SendNow => {
                        // Immediate send; any accumulated delay is void.
                        if self.sender.send(message) {
                            self.state.record_sent();
                        }
                    }
                    Outcome::Continue | Outcome::Modified => {
                        if !decision.accumulated_delay.is_zero() {
                            std::thread::sleep(decision.accumulated_delay);
                        }
                        if self.sender.send(message) {
                            self.state.record_sent();
                        }
                    }
                }

                if (i + 1) % PROGRESS_INTERVAL == 0 {
                    self.log_progress(i + 1, total);
                }
            }

            if !self.loop_forever {
                break;
            }
        }

        self.engine.notify_playback_end();
        self.sender.flush();

        let elapsed = started.elapsed();
        let sent = self.state.total_sent();
        tracing::info!(
            duration_ms = elapsed.as_millis() as u64,
            sent,
            dropped = self.state.messages_dropped(),
            queued = self.state.messages_queued(),
            avg_rate = (sent as f64 / elapsed.as_secs_f64().max(1e-9)) as u64,
            "replay complete"
        );

        Ok(())
    }

    fn log_progress(&self, processed: usize, total: usize) {
        tracing::info!(
            processed,
            total,
            pct = 100.0 * processed as f64 / total as f64,
            rate = self.state.current_rate(),
            sent = self.state.total_sent(),
            dropped = self.state.messages_dropped(),
            "replay progress"
        );
    }
}
