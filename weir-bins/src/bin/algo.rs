//! Client trading algorithm.
//!
//! Joins the market-data multicast, connects to the exchange, and runs
//! the three-core pipeline for a fixed duration, then prints final
//! statistics including tick-to-trade latency percentiles.

use std::net::Ipv4Addr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use weir_bins::common::init_logging;
use weir_core::pipeline::{ClientPipeline, PipelineConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Three-core client trading algorithm")]
struct Args {
    /// Market-data multicast group (e.g. 239.255.0.1).
    mcast_addr: Ipv4Addr,

    /// Market-data UDP port.
    md_port: u16,

    /// Exchange host.
    ex_host: String,

    /// Exchange order-entry port.
    ex_port: u16,

    /// How long to run, in seconds.
    duration_sec: u64,

    /// Log level when RUST_LOG is unset.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = PipelineConfig::new(
        args.mcast_addr,
        args.md_port,
        args.ex_host,
        args.ex_port,
        Duration::from_secs(args.duration_sec),
    );

    let pipeline = ClientPipeline::new(config);
    let stop = Arc::new(AtomicBool::new(false));
    let report = pipeline.run(stop)?;

    let lat = &report.tick_to_trade;
    tracing::info!("=== final statistics ===");
    tracing::info!("market data received:  {}", report.md_received);
    tracing::info!("market data processed: {}", report.md_processed);
    tracing::info!("market data dropped:   {}", report.md_dropped);
    tracing::info!("orders sent:           {}", report.orders_sent);
    tracing::info!("executions received:   {}", report.execs_received);
    tracing::info!("final position:        {}", report.final_position);
    tracing::info!("md queue high water:   {}", report.md_high_water);
    tracing::info!("exec queue high water: {}", report.exec_high_water);
    if lat.samples_recorded > 0 {
        tracing::info!(
            "tick-to-trade us: min={:.1} mean={:.1} p50={:.1} p95={:.1} p99={:.1} p99.9={:.1} max={:.1} (n={})",
            lat.min_us,
            lat.mean_us,
            lat.median_us,
            lat.p95_us,
            lat.p99_us,
            lat.p999_us,
            lat.max_us,
            lat.samples_recorded
        );
    }

    Ok(())
}
