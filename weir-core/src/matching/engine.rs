//! Multi-protocol matching engine stub.
//!
//! Accepts TCP clients concurrently, reads 64-byte order-entry records,
//! normalizes them through the protocol adapter, and answers each with a
//! 32-byte execution report marked Filled. There is no order book, no
//! partial fills, no persistence — this is the far end of the pipeline,
//! present so the client algorithm has something real to talk to.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::wire::adapter;
use crate::wire::{symbol_str, ExecStatus, ExecutionReport, ProtocolMode};
use crate::wire::order_entry::ORDER_ENTRY_SIZE;

/// TCP order-entry server that fills everything immediately.
pub struct MatchingEngine {
    listener: TcpListener,
    mode: ProtocolMode,
    orders_received: Arc<AtomicU64>,
    fills_sent: Arc<AtomicU64>,
}

impl MatchingEngine {
    /// Bind the listening socket. Port 0 picks a free port (tests).
    pub fn bind(port: u16, mode: ProtocolMode) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .with_context(|| format!("binding matching engine to port {port}"))?;

        tracing::info!(
            addr = %listener.local_addr().context("reading local address")?,
            mode = ?mode,
            "matching engine listening"
        );

        Ok(Self {
            listener,
            mode,
            orders_received: Arc::new(AtomicU64::new(0)),
            fills_sent: Arc::new(AtomicU64::new(0)),
        })
    }

    /// The bound address (useful when constructed with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("reading local address")
    }

    pub fn orders_received(&self) -> u64 {
        self.orders_received.load(Ordering::Relaxed)
    }

    pub fn fills_sent(&self) -> u64 {
        self.fills_sent.load(Ordering::Relaxed)
    }

    /// Accept clients until `stop` is set. Each client gets its own
    /// thread; a client error ends that client only.
    pub fn run(&self, stop: Arc<AtomicBool>) -> Result<()> {
        self.listener
            .set_nonblocking(true)
            .context("setting listener non-blocking")?;

        while !stop.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    tracing::info!(%peer, "client connected");
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::warn!("failed to set TCP_NODELAY: {e}");
                    }
                    let mode = self.mode;
                    let stop = Arc::clone(&stop);
                    let orders = Arc::clone(&self.orders_received);
                    let fills = Arc::clone(&self.fills_sent);
                    std::thread::spawn(move || {
                        if let Err(e) = handle_client(stream, mode, &stop, &orders, &fills) {
                            tracing::warn!(%peer, "client session ended: {e:#}");
                        } else {
                            tracing::info!(%peer, "client disconnected");
                        }
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    tracing::error!("accept failed: {e}");
                }
            }
        }

        tracing::info!(
            orders = self.orders_received(),
            fills = self.fills_sent(),
            "matching engine stopped"
        );
        Ok(())
    }
}

/// Read 64-byte records and answer each with a Filled report.
fn handle_client(
    mut stream: TcpStream,
    mode: ProtocolMode,
    stop: &AtomicBool,
    orders: &AtomicU64,
    fills: &AtomicU64,
) -> Result<()> {
    // Accepted sockets may inherit the listener's non-blocking flag on
    // some platforms; this session wants blocking reads with a short
    // timeout so it notices a stop request.
    stream
        .set_nonblocking(false)
        .context("setting client socket blocking")?;
    stream
        .set_read_timeout(Some(Duration::from_millis(100)))
        .context("setting client read timeout")?;

    let mut record = [0u8; ORDER_ENTRY_SIZE];
    let mut filled = 0usize;

    while !stop.load(Ordering::Relaxed) {
        match stream.read(&mut record[filled..]) {
            Ok(0) => return Ok(()), // peer closed
            Ok(n) => {
                filled += n;
                if filled < ORDER_ENTRY_SIZE {
                    continue; // partial record; keep reading
                }
                filled = 0;

                let order = adapter::decode(mode, &record);
                orders.fetch_add(1, Ordering::Relaxed);

                tracing::debug!(
                    protocol = order.protocol.name(),
                    symbol = symbol_str(&order.symbol),
                    side = %(order.side as char),
                    qty = order.quantity,
                    price_dollars = order.price as f64 / 10_000.0,
                    order_id = order.order_id,
                    "order received"
                );

                let report = ExecutionReport {
                    order_id: order.order_id as u32,
                    symbol: order.symbol,
                    exec_qty: order.quantity,
                    exec_price: order.price,
                    status: ExecStatus::Filled as u32,
                };
                let mut out = [0u8; ExecutionReport::SIZE];
                report.encode(&mut out);
                stream
                    .write_all(&out)
                    .context("sending execution report")?;
                fills.fetch_add(1, Ordering::Relaxed);
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => return Err(e).context("reading order record"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::pad_symbol;
    use crate::wire::OuchOrder;

    fn spawn_engine(mode: ProtocolMode) -> (SocketAddr, Arc<AtomicBool>) {
        let engine = MatchingEngine::bind(0, mode).unwrap();
        let addr = engine.local_addr().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let run_stop = Arc::clone(&stop);
        std::thread::spawn(move || engine.run(run_stop));
        (addr, stop)
    }

    fn read_report(stream: &mut TcpStream) -> ExecutionReport {
        let mut buf = [0u8; ExecutionReport::SIZE];
        let mut got = 0;
        while got < buf.len() {
            got += stream.read(&mut buf[got..]).unwrap();
        }
        ExecutionReport::decode(&buf)
    }

    #[test]
    fn fills_an_ouch_order() {
        let (addr, stop) = spawn_engine(ProtocolMode::Auto);

        let mut stream = TcpStream::connect(addr).unwrap();
        let order = OuchOrder {
            client_order_id: 0xDEAD_BEEF_0000_0042,
            symbol: pad_symbol("AAPL"),
            shares: 100,
            price: 1_502_500,
            side: b'B',
            time_in_force: b'0',
            order_type: b'O',
            capacity: b'A',
            reserved: 0,
        };
        let mut buf = [0u8; ORDER_ENTRY_SIZE];
        order.encode(&mut buf);
        stream.write_all(&buf).unwrap();

        let report = read_report(&mut stream);
        assert_eq!(report.status, ExecStatus::Filled as u32);
        assert_eq!(report.symbol, pad_symbol("AAPL"));
        assert_eq!(report.exec_qty, 100);
        assert_eq!(report.exec_price, 1_502_500);
        // Low 32 bits of the client order id.
        assert_eq!(report.order_id, 0x0000_0042);

        stop.store(true, Ordering::Relaxed);
    }

    #[test]
    fn survives_partial_record_delivery() {
        let (addr, stop) = spawn_engine(ProtocolMode::Fixed(crate::wire::Protocol::Ouch));

        let mut stream = TcpStream::connect(addr).unwrap();
        let order = OuchOrder {
            client_order_id: 7,
            symbol: pad_symbol("MSFT"),
            shares: 10,
            price: 4_100_000,
            side: b'S',
            time_in_force: b'0',
            order_type: b'O',
            capacity: b'A',
            reserved: 0,
        };
        let mut buf = [0u8; ORDER_ENTRY_SIZE];
        order.encode(&mut buf);

        // Send the record in two chunks with a pause between.
        stream.write_all(&buf[..20]).unwrap();
        stream.flush().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        stream.write_all(&buf[20..]).unwrap();

        let report = read_report(&mut stream);
        assert_eq!(report.order_id, 7);
        assert_eq!(report.exec_qty, 10);

        stop.store(true, Ordering::Relaxed);
    }
}
