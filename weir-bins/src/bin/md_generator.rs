//! Market-data capture generator.
//!
//! Writes a capture of synthetic exchange messages: random-walk prices
//! over a small symbol table, a realistic mix of record types, and
//! monotone sequence numbers.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use weir_bins::common::init_logging;
use weir_core::feed::CaptureWriter;
use weir_core::wire::{
    pad_symbol, AddOrder, MarketDataMessage, MarketDepth, OrderCancel, OrderDelete,
    OrderExecuted, Trade,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a synthetic market-data capture")]
struct Args {
    /// Output capture file.
    output_file: PathBuf,

    /// Number of messages to generate.
    #[arg(long, default_value = "100000")]
    messages: u64,

    /// Comma-separated symbol list.
    #[arg(long, default_value = "AAPL,MSFT,AMZN,SPY,TSLA")]
    symbols: String,

    /// Log level when RUST_LOG is unset.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let symbols: Vec<[u8; 8]> = args
        .symbols
        .split(',')
        .filter(|s| !s.is_empty())
        .map(pad_symbol)
        .collect();
    anyhow::ensure!(!symbols.is_empty(), "at least one symbol required");

    let mut writer = CaptureWriter::create(&args.output_file)?;
    let mut rng = rand::thread_rng();

    // Prices start around $100-$500 and random-walk in ticks.
    let mut prices: HashMap<[u8; 8], u32> = symbols
        .iter()
        .map(|&s| (s, rng.gen_range(1_000_000..5_000_000)))
        .collect();
    let mut order_ref: u64 = 1;

    for seq in 1..=args.messages {
        let stock = symbols[rng.gen_range(0..symbols.len())];
        let price = prices.get_mut(&stock).expect("price seeded per symbol");
        // Walk up to 10 ticks either way, staying above a dollar.
        let step = rng.gen_range(-100i64..=100) * 10;
        *price = (*price as i64 + step).max(10_000) as u32;

        let side = if rng.gen_bool(0.5) { b'B' } else { b'S' };
        let shares = rng.gen_range(1..=10) * 100;

        let message = match rng.gen_range(0..100) {
            // Mostly new orders.
            0..=59 => {
                order_ref += 1;
                MarketDataMessage::AddOrder(AddOrder {
                    sequence_number: seq,
                    order_ref,
                    stock,
                    shares,
                    price: *price,
                    side,
                })
            }
            60..=74 => MarketDataMessage::Trade(Trade {
                sequence_number: seq,
                order_ref,
                side,
                shares,
                stock,
                price: *price,
            }),
            75..=84 => MarketDataMessage::OrderExecuted(OrderExecuted {
                sequence_number: seq,
                order_ref: order_ref as u32,
                executed_shares: shares,
                match_number: seq,
            }),
            85..=92 => MarketDataMessage::OrderCancel(OrderCancel {
                sequence_number: seq,
                order_ref: order_ref as u32,
                canceled_shares: shares,
            }),
            93..=96 => MarketDataMessage::OrderDelete(OrderDelete {
                sequence_number: seq,
                order_ref: order_ref as u32,
            }),
            _ => MarketDataMessage::MarketDepth(MarketDepth {
                sequence_number: seq,
                stock,
                update_action: b'M',
                side,
                price: *price,
                shares,
                position: rng.gen_range(1..=5),
            }),
        };

        writer.write(&message)?;
    }

    writer.flush()?;
    tracing::info!(
        file = %args.output_file.display(),
        messages = writer.records_written(),
        symbols = symbols.len(),
        "capture written"
    );

    Ok(())
}
