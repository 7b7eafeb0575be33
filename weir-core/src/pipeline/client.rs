//! Pipeline wiring: three pinned workers, two rings, one TCP session.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::feed::parse_packet;
use crate::net::{TcpClient, UdpMulticastReceiver};
use crate::perf::{cpu_pause, CorePin, HighResClock, LatencyStats, LatencyTracker, PinnedWorker};
use crate::pipeline::PipelineStats;
use crate::ring::SpscRing;
use crate::wire::order_entry::ORDER_ENTRY_SIZE;
use crate::wire::{ExecStatus, ExecutionReport, MarketDataMessage, OuchOrder};

/// Market-data ring capacity (drop-tolerant).
pub const MD_RING_CAPACITY: usize = 32_768;
/// Execution-report ring capacity (drop-intolerant).
pub const EXEC_RING_CAPACITY: usize = 16_384;

/// How long the exec ring may stay full before the condition is reported
/// as critical.
const EXEC_RING_GRACE: Duration = Duration::from_secs(5);

/// Client pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub multicast_group: Ipv4Addr,
    pub md_port: u16,
    pub exchange_host: String,
    pub exchange_port: u16,
    pub duration: Duration,
    /// Send one order per this many market-data messages.
    pub order_interval: u64,
    /// Cores for (md receiver, trading, exec receiver).
    pub cores: [CorePin; 3],
}

impl PipelineConfig {
    pub fn new(
        multicast_group: Ipv4Addr,
        md_port: u16,
        exchange_host: impl Into<String>,
        exchange_port: u16,
        duration: Duration,
    ) -> Self {
        Self {
            multicast_group,
            md_port,
            exchange_host: exchange_host.into(),
            exchange_port,
            duration,
            order_interval: 100,
            cores: [CorePin::Core(0), CorePin::Core(1), CorePin::Core(2)],
        }
    }
}

/// What the pipeline did, reported at shutdown.
#[derive(Debug, Clone, Copy)]
pub struct PipelineReport {
    pub md_received: u64,
    pub md_processed: u64,
    pub md_dropped: u64,
    pub orders_sent: u64,
    pub execs_received: u64,
    pub md_high_water: usize,
    pub exec_high_water: usize,
    pub final_position: i64,
    pub tick_to_trade: LatencyStats,
}

/// Owns the rings and workers for one pipeline run.
pub struct ClientPipeline {
    config: PipelineConfig,
}

impl ClientPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Connect, spawn the three workers, run for the configured duration
    /// (or until `stop` is set externally), and report.
    pub fn run(&self, stop: Arc<AtomicBool>) -> Result<PipelineReport> {
        let config = &self.config;

        // Calibrate the clock before the hot path needs it.
        HighResClock::calibrate();

        let md_receiver = UdpMulticastReceiver::new(config.multicast_group, config.md_port)
            .context("joining market-data multicast")?;

        let order_client =
            TcpClient::connect((config.exchange_host.as_str(), config.exchange_port))
                .context("connecting to exchange")?;
        let exec_client = order_client.try_clone()?;
        exec_client.set_read_timeout(Some(Duration::from_millis(100)))?;

        let md_ring: Arc<SpscRing<MarketDataMessage, MD_RING_CAPACITY>> =
            Arc::new(SpscRing::new());
        let exec_ring: Arc<SpscRing<ExecutionReport, EXEC_RING_CAPACITY>> =
            Arc::new(SpscRing::new());
        let stats = Arc::new(PipelineStats::new());
        let position = Arc::new(std::sync::atomic::AtomicI64::new(0));
        let latency = Arc::new(Mutex::new(LatencyTracker::new()));

        let md_worker = {
            let ring = Arc::clone(&md_ring);
            let stats = Arc::clone(&stats);
            PinnedWorker::spawn(
                "md-recv",
                config.cores[0],
                Arc::clone(&stop),
                move |stop| md_receiver_loop(stop, &md_receiver, &ring, &stats),
            )
        };

        let exec_worker = {
            let ring = Arc::clone(&exec_ring);
            let stats = Arc::clone(&stats);
            PinnedWorker::spawn(
                "exec-recv",
                config.cores[2],
                Arc::clone(&stop),
                move |stop| exec_receiver_loop(stop, exec_client, &ring, &stats),
            )
        };

        let trading_worker = {
            let md_ring = Arc::clone(&md_ring);
            let exec_ring = Arc::clone(&exec_ring);
            let stats = Arc::clone(&stats);
            let position = Arc::clone(&position);
            let latency = Arc::clone(&latency);
            let order_interval = config.order_interval;
            PinnedWorker::spawn(
                "trading",
                config.cores[1],
                Arc::clone(&stop),
                move |stop| {
                    trading_loop(
                        stop,
                        &md_ring,
                        &exec_ring,
                        order_client,
                        &stats,
                        &position,
                        &latency,
                        order_interval,
                    )
                },
            )
        };

        let exchange = format!("{}:{}", config.exchange_host, config.exchange_port);
        tracing::info!(
            group = %config.multicast_group,
            md_port = config.md_port,
            exchange = %exchange,
            duration_secs = config.duration.as_secs(),
            "pipeline running"
        );

        // Supervise: per-second stats until the duration elapses or a
        // worker signals stop.
        let started = Instant::now();
        while !stop.load(Ordering::Relaxed) && started.elapsed() < config.duration {
            std::thread::sleep(Duration::from_secs(1).min(config.duration));
            tracing::info!(
                elapsed_secs = started.elapsed().as_secs(),
                md_received = stats.md_received(),
                md_processed = stats.md_processed(),
                md_dropped = md_ring.dropped(),
                orders = stats.orders_sent(),
                execs = stats.execs_received(),
                md_queue_hwm = md_ring.high_water_mark(),
                "pipeline stats"
            );
        }
        stop.store(true, Ordering::Relaxed);

        drop(md_worker);
        drop(trading_worker);
        drop(exec_worker);

        let tick_to_trade = latency
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .stats();

        let report = PipelineReport {
            md_received: stats.md_received(),
            md_processed: stats.md_processed(),
            md_dropped: md_ring.dropped() as u64,
            orders_sent: stats.orders_sent(),
            execs_received: stats.execs_received(),
            md_high_water: md_ring.high_water_mark(),
            exec_high_water: exec_ring.high_water_mark(),
            final_position: position.load(Ordering::Relaxed),
            tick_to_trade,
        };

        tracing::info!(
            md_received = report.md_received,
            md_processed = report.md_processed,
            md_dropped = report.md_dropped,
            orders_sent = report.orders_sent,
            execs_received = report.execs_received,
            final_position = report.final_position,
            "pipeline finished"
        );

        Ok(report)
    }
}

/// Core 0: minimal path from the kernel to the ring.
fn md_receiver_loop(
    stop: &AtomicBool,
    receiver: &UdpMulticastReceiver,
    ring: &SpscRing<MarketDataMessage, MD_RING_CAPACITY>,
    stats: &PipelineStats,
) {
    let mut buf = [0u8; 2048];

    while !stop.load(Ordering::Relaxed) {
        match receiver.recv(&mut buf) {
            Ok(n) => match parse_packet(&buf[..n], ring) {
                Ok(decoded) => stats.add_md_received(decoded as u64),
                // Malformed datagram: drop it, keep receiving.
                Err(e) => tracing::warn!("bad market-data packet: {e}"),
            },
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Timeout: just poll the stop flag again.
            }
            Err(e) => {
                tracing::error!("market-data recv failed: {e}");
                break;
            }
        }
    }
}

/// Core 2: execution reports off the TCP stream into the exec ring.
///
/// The exec ring must not drop. When it is full the push is retried with
/// spin hints; if it stays full past the grace period the condition is
/// reported as critical (once per episode) but the loop keeps trying.
fn exec_receiver_loop(
    stop: &AtomicBool,
    mut client: TcpClient,
    ring: &SpscRing<ExecutionReport, EXEC_RING_CAPACITY>,
    stats: &PipelineStats,
) {
    let mut record = [0u8; ExecutionReport::SIZE];
    let mut filled = 0usize;

    while !stop.load(Ordering::Relaxed) {
        match client.recv(&mut record[filled..]) {
            Ok(0) => {
                tracing::info!("exchange closed the connection");
                break;
            }
            Ok(n) => {
                filled += n;
                if filled < ExecutionReport::SIZE {
                    continue;
                }
                filled = 0;

                if ExecutionReport::wire_msg_type(&record) != ExecutionReport::MSG_TYPE {
                    tracing::warn!("unexpected message type on exec stream, skipping record");
                    continue;
                }
                let report = ExecutionReport::decode(&record);
                stats.inc_execs_received();

                let mut full_since: Option<Instant> = None;
                let mut reported = false;
                while !ring.try_push(report) {
                    let since = *full_since.get_or_insert_with(Instant::now);
                    if !reported && since.elapsed() >= EXEC_RING_GRACE {
                        tracing::error!(
                            "critical: exec ring full for {}s, trading thread stalled?",
                            EXEC_RING_GRACE.as_secs()
                        );
                        reported = true;
                    }
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    cpu_pause();
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Timeout: poll the stop flag.
            }
            Err(e) => {
                tracing::error!("exec recv failed: {e}");
                break;
            }
        }
    }
}

/// Core 1: the trading hot path.
///
/// Per tick: drain execution reports first (state correctness beats
/// signal latency), then process one market-data message and possibly
/// send an order, else pause.
#[allow(clippy::too_many_arguments)]
fn trading_loop(
    stop: &AtomicBool,
    md_ring: &SpscRing<MarketDataMessage, MD_RING_CAPACITY>,
    exec_ring: &SpscRing<ExecutionReport, EXEC_RING_CAPACITY>,
    mut order_client: TcpClient,
    stats: &PipelineStats,
    position: &std::sync::atomic::AtomicI64,
    latency: &Mutex<LatencyTracker>,
    order_interval: u64,
) {
    // Single uncontended acquisition for the life of the thread; the
    // supervisor only locks after the worker has exited.
    let mut latency = latency
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let mut next_order_id: u64 = 1;
    let mut md_count: u64 = 0;
    // Side/qty of in-flight orders, keyed by the low 32 bits of the id
    // (which is what the exec report echoes back).
    let mut in_flight: std::collections::HashMap<u32, (u8, u32)> =
        std::collections::HashMap::new();
    let mut order_buf = [0u8; ORDER_ENTRY_SIZE];

    while !stop.load(Ordering::Relaxed) {
        // Priority 1: executions update position before any new decision.
        while let Some(exec) = exec_ring.try_pop() {
            if exec.status == ExecStatus::Filled as u32 {
                if let Some((side, qty)) = in_flight.remove(&exec.order_id) {
                    let signed = if side == b'B' {
                        qty as i64
                    } else {
                        -(qty as i64)
                    };
                    position.fetch_add(signed, Ordering::Relaxed);
                }
                tracing::debug!(
                    order_id = exec.order_id,
                    qty = exec.exec_qty,
                    price_dollars = exec.exec_price as f64 / 10_000.0,
                    "fill"
                );
            }
        }

        // Priority 2: one market-data message per iteration.
        match md_ring.try_pop() {
            Some(md) => {
                let t0 = HighResClock::now();
                stats.inc_md_processed();
                md_count += 1;

                // Toy signal: an order every N messages, alternating side,
                // priced off the message itself when it carries a price.
                if md_count % order_interval == 0 {
                    if let (Some(symbol), Some(price)) = (md.symbol(), md.price()) {
                        let order_id = next_order_id;
                        next_order_id += 1;
                        let side = if order_id % 2 == 0 { b'B' } else { b'S' };

                        let order = OuchOrder {
                            client_order_id: order_id,
                            symbol: *symbol,
                            shares: 100,
                            price,
                            side,
                            time_in_force: b'0',
                            order_type: b'O',
                            capacity: b'A',
                            reserved: 0,
                        };
                        order.encode(&mut order_buf);

                        if order_client.send_all(&order_buf) {
                            let t1 = HighResClock::now();
                            latency.record(t0, t1);
                            in_flight.insert(order_id as u32, (side, 100));
                            stats.inc_orders_sent();
                        } else {
                            tracing::error!("order send failed, stopping trading thread");
                            break;
                        }
                    }
                }
            }
            None => cpu_pause(),
        }
    }
}
