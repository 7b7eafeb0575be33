//! End-to-end replay scenarios: capture in, rules applied, sends observed.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use weir_core::feed::CaptureWriter;
use weir_core::net::{NullSender, Sender};
use weir_core::replay::{
    BurstRule, ContinuousRule, PacketLossRule, RateLimitRule, Replayer,
};
use weir_core::wire::{pad_symbol, AddOrder, MarketDataMessage};

/// Sender that records the instant of every send.
#[derive(Clone, Default)]
struct RecordingSender {
    sends: Arc<Mutex<Vec<Instant>>>,
}

impl RecordingSender {
    fn new() -> Self {
        Self::default()
    }

    fn timestamps(&self) -> Vec<Instant> {
        self.sends.lock().unwrap().clone()
    }
}

impl Sender for RecordingSender {
    fn send(&mut self, _message: &[u8]) -> bool {
        self.sends.lock().unwrap().push(Instant::now());
        true
    }

    fn messages_sent(&self) -> usize {
        self.sends.lock().unwrap().len()
    }
}

fn write_capture(n: u64) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.cap");
    let mut writer = CaptureWriter::create(&path).unwrap();
    for seq in 0..n {
        writer
            .write(&MarketDataMessage::AddOrder(AddOrder {
                sequence_number: seq,
                order_ref: seq,
                stock: pad_symbol("AAPL"),
                shares: 100,
                price: 1_000_000,
                side: b'B',
            }))
            .unwrap();
    }
    writer.flush().unwrap();
    (dir, path)
}

/// Burst(5, 100ms) over 20 messages: four bursts of five, roughly 300 ms
/// of inter-burst waiting in total. Bounds are generous for shared CI
/// hardware.
#[test]
fn burst_rule_groups_sends_into_bursts() {
    let (_dir, path) = write_capture(20);
    let sender = RecordingSender::new();
    let observer = sender.clone();

    let mut replayer = Replayer::new(Box::new(sender));
    replayer.load(&path).unwrap();
    replayer.add_rule(Box::new(BurstRule::new(5, Duration::from_millis(100))));

    let start = Instant::now();
    replayer.run().unwrap();
    let elapsed = start.elapsed();

    assert_eq!(replayer.state().total_sent(), 20);
    // Three inter-burst gaps of ~100 ms each.
    assert!(elapsed >= Duration::from_millis(250), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(900), "elapsed {elapsed:?}");

    // The first burst of five leaves within a few milliseconds of start.
    let stamps = observer.timestamps();
    assert_eq!(stamps.len(), 20);
    let first_burst_spread = stamps[4].duration_since(stamps[0]);
    assert!(
        first_burst_spread < Duration::from_millis(50),
        "first burst spread {first_burst_spread:?}"
    );
    // The sixth send waits for the burst interval.
    let gap = stamps[5].duration_since(stamps[4]);
    assert!(gap >= Duration::from_millis(50), "gap {gap:?}");
}

/// PacketLoss(0.25) over 10 000 messages: the drop ratio lands near 25%.
#[test]
fn packet_loss_ratio_converges() {
    let (_dir, path) = write_capture(10_000);
    let mut replayer = Replayer::new(Box::new(NullSender::new()));
    replayer.load(&path).unwrap();
    replayer.add_rule(Box::new(PacketLossRule::with_seed(0.25, 2024)));

    replayer.run().unwrap();

    let dropped = replayer.state().messages_dropped();
    let ratio = dropped as f64 / 10_000.0;
    assert!(
        (0.23..=0.27).contains(&ratio),
        "loss ratio {ratio} (dropped {dropped})"
    );
    assert_eq!(replayer.state().total_sent() + dropped, 10_000);
}

/// Continuous(100k/s) wants to finish in 5 ms; RateLimit(1k/s) must
/// stretch 500 messages to at least ~0.5 s without dropping anything.
#[test]
fn safety_rate_limit_overrides_continuous_pacing() {
    let (_dir, path) = write_capture(500);
    let mut replayer = Replayer::new(Box::new(NullSender::new()));
    replayer.load(&path).unwrap();
    replayer.add_rule(Box::new(ContinuousRule::new(100_000)));
    replayer.add_rule(Box::new(RateLimitRule::new(1_000)));

    let start = Instant::now();
    replayer.run().unwrap();
    let elapsed = start.elapsed();

    assert_eq!(replayer.state().messages_dropped(), 0);
    assert_eq!(replayer.state().total_sent(), 500);
    // Without the limit this finishes in ~5 ms.
    assert!(elapsed >= Duration::from_millis(400), "elapsed {elapsed:?}");
}

/// The original sizing of the safety scenario: 5 000 messages under a
/// 1 000/s ceiling take at least five seconds. Slow; run with --ignored.
#[test]
#[ignore = "five-second wall-clock test"]
fn safety_rate_limit_full_scale() {
    let (_dir, path) = write_capture(5_000);
    let mut replayer = Replayer::new(Box::new(NullSender::new()));
    replayer.load(&path).unwrap();
    replayer.add_rule(Box::new(ContinuousRule::new(100_000)));
    replayer.add_rule(Box::new(RateLimitRule::new(1_000)));

    let start = Instant::now();
    replayer.run().unwrap();

    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(replayer.state().messages_dropped(), 0);
}

/// Loop-forever is exercised indirectly everywhere else; here we prove a
/// single pass sends each record exactly once in file order.
#[test]
fn single_pass_sends_in_capture_order() {
    let (_dir, path) = write_capture(100);
    let sender = RecordingSender::new();
    let observer = sender.clone();

    let mut replayer = Replayer::new(Box::new(sender));
    replayer.load(&path).unwrap();
    replayer.run().unwrap();

    let stamps = observer.timestamps();
    assert_eq!(stamps.len(), 100);
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}
