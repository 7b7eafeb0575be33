//! Protocol auto-detection through a live matching engine (one TCP
//! session, three protocols interleaved).

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use weir_core::matching::MatchingEngine;
use weir_core::wire::order_entry::ORDER_ENTRY_SIZE;
use weir_core::wire::{
    pad_symbol, CmeOrder, ExecStatus, ExecutionReport, OuchOrder, PillarOrder, ProtocolMode,
};
use weir_core::wire::adapter::{decode, detect_protocol};
use weir_core::wire::Protocol;

fn read_report(stream: &mut TcpStream) -> ExecutionReport {
    let mut buf = [0u8; ExecutionReport::SIZE];
    let mut got = 0;
    while got < buf.len() {
        got += stream.read(&mut buf[got..]).unwrap();
    }
    ExecutionReport::decode(&buf)
}

#[test]
fn auto_detect_fills_all_three_protocols() {
    let engine = MatchingEngine::bind(0, ProtocolMode::Auto).unwrap();
    let addr = engine.local_addr().unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let run_stop = Arc::clone(&stop);
    let server = std::thread::spawn(move || {
        let _ = engine.run(run_stop);
    });

    let mut stream = TcpStream::connect(addr).unwrap();
    let mut buf = [0u8; ORDER_ENTRY_SIZE];

    // OUCH: orderType 'O'.
    let ouch = OuchOrder {
        client_order_id: 1,
        symbol: pad_symbol("AAPL"),
        shares: 100,
        price: 1_502_500,
        side: b'B',
        time_in_force: b'0',
        order_type: b'O',
        capacity: b'A',
        reserved: 0,
    };
    ouch.encode(&mut buf);
    assert_eq!(detect_protocol(&buf), Protocol::Ouch);
    assert_eq!(decode(ProtocolMode::Auto, &buf).protocol, Protocol::Ouch);
    stream.write_all(&buf).unwrap();
    let report = read_report(&mut stream);
    assert_eq!(report.symbol, pad_symbol("AAPL"));
    assert_eq!(report.status, ExecStatus::Filled as u32);

    // Pillar: orderType 'L', equity symbol.
    let pillar = PillarOrder {
        client_order_id: 2,
        symbol: pad_symbol("IBM"),
        shares: 200,
        price: 1_890_000,
        side: b'S',
        order_type: b'L',
        tif: b'0',
    };
    pillar.encode(&mut buf);
    assert_eq!(detect_protocol(&buf), Protocol::Pillar);
    assert_eq!(decode(ProtocolMode::Auto, &buf).protocol, Protocol::Pillar);
    stream.write_all(&buf).unwrap();
    let report = read_report(&mut stream);
    assert_eq!(report.symbol, pad_symbol("IBM"));
    assert_eq!(report.status, ExecStatus::Filled as u32);

    // CME: orderType 'L', futures symbol (month code + year digit).
    let cme = CmeOrder {
        client_order_id: 3,
        symbol: pad_symbol("ESZ4"),
        quantity: 5,
        price: 45_500_000,
        side: b'B',
        order_type: b'L',
        tif: b'0',
    };
    cme.encode(&mut buf);
    assert_eq!(detect_protocol(&buf), Protocol::Cme);
    assert_eq!(decode(ProtocolMode::Auto, &buf).protocol, Protocol::Cme);
    stream.write_all(&buf).unwrap();
    let report = read_report(&mut stream);
    assert_eq!(report.symbol, pad_symbol("ESZ4"));
    assert_eq!(report.exec_qty, 5);
    assert_eq!(report.status, ExecStatus::Filled as u32);

    stop.store(true, Ordering::Relaxed);
    server.join().unwrap();
}

#[test]
fn fixed_mode_overrides_detection() {
    let engine = MatchingEngine::bind(0, ProtocolMode::Fixed(Protocol::Pillar)).unwrap();
    let addr = engine.local_addr().unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let run_stop = Arc::clone(&stop);
    std::thread::spawn(move || {
        let _ = engine.run(run_stop);
    });

    // A futures-looking symbol still decodes as Pillar in fixed mode.
    let cme_shaped = CmeOrder {
        client_order_id: 9,
        symbol: pad_symbol("NQH5"),
        quantity: 3,
        price: 157_000_000,
        side: b'B',
        order_type: b'L',
        tif: b'0',
    };
    let mut buf = [0u8; ORDER_ENTRY_SIZE];
    cme_shaped.encode(&mut buf);

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(&buf).unwrap();
    let report = read_report(&mut stream);
    // Shares/price land in the same offsets, so the fill echoes them.
    assert_eq!(report.exec_qty, 3);
    assert_eq!(report.order_id, 9);

    stop.store(true, Ordering::Relaxed);
}
