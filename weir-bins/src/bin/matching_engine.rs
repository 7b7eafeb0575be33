//! Multi-protocol matching engine stub.
//!
//! Accepts order-entry clients on TCP and fills every order immediately.
//! Protocol is auto-detected per message unless fixed on the command
//! line.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use weir_bins::common::init_logging;
use weir_core::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Order-entry matching engine (echo-as-filled)")]
struct Args {
    /// Port to listen on.
    port: u16,

    /// Protocol mode: auto, ouch, pillar or cme.
    #[arg(default_value = "auto")]
    protocol: ProtocolMode,

    /// Log level when RUST_LOG is unset.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let engine = MatchingEngine::bind(args.port, args.protocol)?;

    // Runs until the process is killed.
    let stop = Arc::new(AtomicBool::new(false));
    engine.run(stop)
}
