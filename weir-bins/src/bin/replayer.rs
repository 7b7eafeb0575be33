//! Market-data replayer.
//!
//! Loads a binary capture and streams it out under the configured rules.
//!
//! Exit codes: 0 on normal completion, 1 on configuration or load
//! failure, 2 when the configured output cannot be brought up (e.g. the
//! TCP client never connects), 3 when the capture contains a malformed
//! record.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use weir_bins::common::init_logging;
use weir_core::feed::PacketError;
use weir_core::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a market-data capture with configurable pacing")]
struct Args {
    /// Binary market-data capture file.
    input_file: PathBuf,

    /// Configuration file (JSON or TOML). Defaults apply without one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

const EXIT_CONFIG: u8 = 1;
const EXIT_OUTPUT_NOT_READY: u8 = 2;
const EXIT_MALFORMED_CAPTURE: u8 = 3;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = match &args.config {
        Some(path) => ReplayConfig::load(path),
        None => ReplayConfig::load_defaults(),
    };
    let config = match config {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("configuration error: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // The sender comes up first: TCP output blocks here until its client
    // connects, and a refused socket means the peer is not ready.
    let sender = match config.build_sender() {
        Ok(sender) => sender,
        Err(e) => {
            tracing::error!("output not ready: {e:#}");
            return ExitCode::from(EXIT_OUTPUT_NOT_READY);
        }
    };

    let mut replayer = Replayer::new(sender);
    for rule in config.build_rules() {
        replayer.add_rule(rule);
    }
    replayer.set_loop_forever(config.loop_forever);

    if let Err(e) = replayer.load(&args.input_file) {
        let malformed = e
            .chain()
            .any(|cause| cause.downcast_ref::<PacketError>().is_some());
        tracing::error!("cannot load {}: {e:#}", args.input_file.display());
        return ExitCode::from(if malformed {
            EXIT_MALFORMED_CAPTURE
        } else {
            EXIT_CONFIG
        });
    }

    match replayer.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("replay failed: {e:#}");
            ExitCode::from(EXIT_CONFIG)
        }
    }
}
