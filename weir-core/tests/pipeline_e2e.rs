//! Full-pipeline smoke test: generator → replayer → UDP multicast →
//! three-core client → TCP matching engine → execution reports.
//!
//! Multicast loopback is not available in every CI network namespace;
//! when the plumbing cannot be verified the test skips rather than
//! reporting a false failure.

use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use weir_core::feed::CaptureWriter;
use weir_core::matching::MatchingEngine;
use weir_core::net::UdpMulticastSender;
use weir_core::perf::CorePin;
use weir_core::pipeline::{ClientPipeline, PipelineConfig};
use weir_core::replay::{ContinuousRule, Replayer};
use weir_core::wire::{pad_symbol, AddOrder, MarketDataMessage, ProtocolMode};

const GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 7, 7);
const PORT: u16 = 39707;

/// Probe whether multicast loopback actually delivers on this host.
fn multicast_loopback_works() -> bool {
    let Ok(rx) = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, PORT)) else {
        return false;
    };
    if rx.join_multicast_v4(&GROUP, &Ipv4Addr::UNSPECIFIED).is_err() {
        return false;
    }
    rx.set_read_timeout(Some(Duration::from_millis(300))).unwrap();

    let Ok(tx) = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)) else {
        return false;
    };
    let _ = tx.set_multicast_loop_v4(true);
    if tx.send_to(b"probe", (GROUP, PORT)).is_err() {
        return false;
    }

    let mut buf = [0u8; 8];
    rx.recv(&mut buf).is_ok()
}

#[test]
fn replayed_stream_produces_orders_and_fills() {
    if !multicast_loopback_works() {
        eprintln!("skipping: multicast loopback unavailable");
        return;
    }

    // Matching engine on an ephemeral port.
    let engine = MatchingEngine::bind(0, ProtocolMode::Auto).unwrap();
    let exchange_addr = engine.local_addr().unwrap();
    let stop_engine = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop_engine);
        std::thread::spawn(move || {
            let _ = engine.run(stop);
        });
    }

    // A capture of 2 000 AddOrders.
    let dir = tempfile::tempdir().unwrap();
    let capture_path = dir.path().join("e2e.cap");
    let mut writer = CaptureWriter::create(&capture_path).unwrap();
    for seq in 0..2_000u64 {
        writer
            .write(&MarketDataMessage::AddOrder(AddOrder {
                sequence_number: seq,
                order_ref: seq,
                stock: pad_symbol("SPY"),
                shares: 100,
                price: 5_000_000 + (seq % 100) as u32,
                side: b'B',
            }))
            .unwrap();
    }
    writer.flush().unwrap();

    // Client pipeline: no pinning in tests, 3-second window.
    let mut config = PipelineConfig::new(GROUP, PORT, "127.0.0.1", exchange_addr.port(), Duration::from_secs(3));
    config.cores = [CorePin::None, CorePin::None, CorePin::None];
    config.order_interval = 50;

    let stop_pipeline = Arc::new(AtomicBool::new(false));
    let pipeline_handle = {
        let stop = Arc::clone(&stop_pipeline);
        std::thread::spawn(move || ClientPipeline::new(config).run(stop))
    };

    // Give the pipeline a moment to join the group, then replay.
    std::thread::sleep(Duration::from_millis(300));
    let sender = UdpMulticastSender::new(GROUP, PORT, 1).unwrap();
    let mut replayer = Replayer::new(Box::new(sender));
    replayer.load(&capture_path).unwrap();
    replayer.add_rule(Box::new(ContinuousRule::new(5_000)));
    replayer.run().unwrap();

    let report = pipeline_handle.join().unwrap().unwrap();
    stop_engine.store(true, Ordering::Relaxed);

    assert!(report.md_received > 0, "no market data received");
    assert!(report.md_processed > 0, "no market data processed");
    assert!(
        report.orders_sent > 0,
        "no orders sent (processed {})",
        report.md_processed
    );
    assert!(
        report.execs_received > 0,
        "no executions received (sent {})",
        report.orders_sent
    );
    // Every fill answers an order; with the echo stub they converge.
    assert!(report.execs_received <= report.orders_sent);
    // Tick-to-trade samples were recorded on the hot path.
    assert_eq!(report.tick_to_trade.count, report.orders_sent);
}
