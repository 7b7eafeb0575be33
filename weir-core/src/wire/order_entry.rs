//! Order-entry protocol records and the execution report.
//!
//! Three simulated exchange order-entry protocols share a common shape:
//! 64 bytes on the wire, client order id and symbol up front, trailing
//! padding reserved for protocol extensions. The matching engine replies
//! with a 32-byte execution report.

use super::{read_u16, read_u32, read_u64, write_u16, write_u32, write_u64, SYMBOL_LEN};

/// Fixed size of every order-entry record.
pub const ORDER_ENTRY_SIZE: usize = 64;

/// OUCH-style enter-order. `order_type` is always `b'O'`, which is what
/// protocol auto-detection keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OuchOrder {
    pub client_order_id: u64,
    pub symbol: [u8; SYMBOL_LEN],
    pub shares: u32,
    pub price: u32,
    pub side: u8,
    /// `b'0'`=Day, `b'3'`=IOC, `b'4'`=FOK, `b'G'`=GTC.
    pub time_in_force: u8,
    pub order_type: u8,
    /// `b'A'`=Agency, `b'P'`=Principal, `b'R'`=Riskless Principal.
    pub capacity: u8,
    pub reserved: u16,
}

impl OuchOrder {
    pub const SIZE: usize = ORDER_ENTRY_SIZE;

    pub fn encode(&self, out: &mut [u8]) {
        out[..Self::SIZE].fill(0);
        write_u64(out, 0, self.client_order_id);
        out[8..16].copy_from_slice(&self.symbol);
        write_u32(out, 16, self.shares);
        write_u32(out, 20, self.price);
        out[24] = self.side;
        out[25] = self.time_in_force;
        out[26] = self.order_type;
        out[27] = self.capacity;
        write_u16(out, 28, self.reserved);
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut symbol = [0u8; SYMBOL_LEN];
        symbol.copy_from_slice(&buf[8..16]);
        Self {
            client_order_id: read_u64(buf, 0),
            symbol,
            shares: read_u32(buf, 16),
            price: read_u32(buf, 20),
            side: buf[24],
            time_in_force: buf[25],
            order_type: buf[26],
            capacity: buf[27],
            reserved: read_u16(buf, 28),
        }
    }
}

/// Pillar-style order entry. `order_type` is `b'L'`, `b'M'` or `b'P'`;
/// the capacity field does not exist on this wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PillarOrder {
    pub client_order_id: u64,
    pub symbol: [u8; SYMBOL_LEN],
    pub shares: u32,
    pub price: u32,
    pub side: u8,
    pub order_type: u8,
    pub tif: u8,
}

impl PillarOrder {
    pub const SIZE: usize = ORDER_ENTRY_SIZE;

    pub fn encode(&self, out: &mut [u8]) {
        out[..Self::SIZE].fill(0);
        write_u64(out, 0, self.client_order_id);
        out[8..16].copy_from_slice(&self.symbol);
        write_u32(out, 16, self.shares);
        write_u32(out, 20, self.price);
        out[24] = self.side;
        out[25] = self.order_type;
        out[26] = self.tif;
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut symbol = [0u8; SYMBOL_LEN];
        symbol.copy_from_slice(&buf[8..16]);
        Self {
            client_order_id: read_u64(buf, 0),
            symbol,
            shares: read_u32(buf, 16),
            price: read_u32(buf, 20),
            side: buf[24],
            order_type: buf[25],
            tif: buf[26],
        }
    }
}

/// CME-style order entry for futures. Same offsets as Pillar; `quantity`
/// counts contracts, not shares, and symbols follow the
/// `[ROOT][MONTH_CODE][YEAR_DIGIT]` convention (e.g. `ESZ4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmeOrder {
    pub client_order_id: u64,
    pub symbol: [u8; SYMBOL_LEN],
    pub quantity: u32,
    pub price: u32,
    pub side: u8,
    pub order_type: u8,
    pub tif: u8,
}

impl CmeOrder {
    pub const SIZE: usize = ORDER_ENTRY_SIZE;

    pub fn encode(&self, out: &mut [u8]) {
        out[..Self::SIZE].fill(0);
        write_u64(out, 0, self.client_order_id);
        out[8..16].copy_from_slice(&self.symbol);
        write_u32(out, 16, self.quantity);
        write_u32(out, 20, self.price);
        out[24] = self.side;
        out[25] = self.order_type;
        out[26] = self.tif;
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut symbol = [0u8; SYMBOL_LEN];
        symbol.copy_from_slice(&buf[8..16]);
        Self {
            client_order_id: read_u64(buf, 0),
            symbol,
            quantity: read_u32(buf, 16),
            price: read_u32(buf, 20),
            side: buf[24],
            order_type: buf[25],
            tif: buf[26],
        }
    }
}

/// Execution outcome reported by the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ExecStatus {
    New = 0,
    PartialFill = 1,
    Filled = 2,
    Cancelled = 3,
}

impl ExecStatus {
    pub const fn from_wire(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::New),
            1 => Some(Self::PartialFill),
            2 => Some(Self::Filled),
            3 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// 32-byte execution report, matching engine → client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionReport {
    pub order_id: u32,
    pub symbol: [u8; SYMBOL_LEN],
    pub exec_qty: u32,
    pub exec_price: u32,
    pub status: u32,
}

impl ExecutionReport {
    pub const SIZE: usize = 32;
    /// Wire message-type discriminator for execution reports.
    pub const MSG_TYPE: u32 = 3;

    pub fn encode(&self, out: &mut [u8]) {
        out[..Self::SIZE].fill(0);
        write_u32(out, 0, Self::MSG_TYPE);
        write_u32(out, 4, self.order_id);
        out[8..16].copy_from_slice(&self.symbol);
        write_u32(out, 16, self.exec_qty);
        write_u32(out, 20, self.exec_price);
        write_u32(out, 24, self.status);
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut symbol = [0u8; SYMBOL_LEN];
        symbol.copy_from_slice(&buf[8..16]);
        Self {
            order_id: read_u32(buf, 4),
            symbol,
            exec_qty: read_u32(buf, 16),
            exec_price: read_u32(buf, 20),
            status: read_u32(buf, 24),
        }
    }

    /// The wire message type of an encoded buffer.
    pub fn wire_msg_type(buf: &[u8]) -> u32 {
        read_u32(buf, 0)
    }
}

// The 64/32-byte sizes are the TCP framing; hold them at compile time.
const _: () = assert!(OuchOrder::SIZE == 64);
const _: () = assert!(PillarOrder::SIZE == 64);
const _: () = assert!(CmeOrder::SIZE == 64);
const _: () = assert!(ExecutionReport::SIZE == 32);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::pad_symbol;

    #[test]
    fn ouch_round_trip() {
        let order = OuchOrder {
            client_order_id: 555,
            symbol: pad_symbol("AAPL"),
            shares: 100,
            price: 1_502_500,
            side: b'B',
            time_in_force: b'0',
            order_type: b'O',
            capacity: b'A',
            reserved: 0,
        };
        let mut buf = [0u8; OuchOrder::SIZE];
        order.encode(&mut buf);
        assert_eq!(OuchOrder::decode(&buf), order);
        // OUCH carries order_type at byte 26; auto-detection relies on it.
        assert_eq!(buf[26], b'O');
    }

    #[test]
    fn pillar_round_trip() {
        let order = PillarOrder {
            client_order_id: 556,
            symbol: pad_symbol("IBM"),
            shares: 200,
            price: 1_890_000,
            side: b'S',
            order_type: b'L',
            tif: b'3',
        };
        let mut buf = [0u8; PillarOrder::SIZE];
        order.encode(&mut buf);
        assert_eq!(PillarOrder::decode(&buf), order);
    }

    #[test]
    fn cme_round_trip() {
        let order = CmeOrder {
            client_order_id: 557,
            symbol: pad_symbol("ESZ4"),
            quantity: 5,
            price: 45_500_000,
            side: b'B',
            order_type: b'L',
            tif: b'0',
        };
        let mut buf = [0u8; CmeOrder::SIZE];
        order.encode(&mut buf);
        assert_eq!(CmeOrder::decode(&buf), order);
    }

    #[test]
    fn exec_report_round_trip() {
        let report = ExecutionReport {
            order_id: 555,
            symbol: pad_symbol("AAPL"),
            exec_qty: 100,
            exec_price: 1_502_500,
            status: ExecStatus::Filled as u32,
        };
        let mut buf = [0u8; ExecutionReport::SIZE];
        report.encode(&mut buf);
        assert_eq!(ExecutionReport::wire_msg_type(&buf), ExecutionReport::MSG_TYPE);
        assert_eq!(ExecutionReport::decode(&buf), report);
    }

    #[test]
    fn exec_status_rejects_unknown_wire_values() {
        assert_eq!(ExecStatus::from_wire(2), Some(ExecStatus::Filled));
        assert_eq!(ExecStatus::from_wire(99), None);
    }

    #[test]
    fn padding_is_zeroed() {
        let order = PillarOrder {
            client_order_id: 1,
            symbol: pad_symbol("IBM"),
            shares: 1,
            price: 1,
            side: b'B',
            order_type: b'L',
            tif: b'0',
        };
        let mut buf = [0xFFu8; PillarOrder::SIZE];
        order.encode(&mut buf);
        assert!(buf[30..].iter().all(|&b| b == 0));
    }
}
