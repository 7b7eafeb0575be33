//! Protocol normalization adapter.
//!
//! The matching engine accepts three order-entry wire formats; this module
//! maps each onto one protocol-neutral [`NormalizedOrder`]. Decoding is a
//! straight field mapping with no validation — validation belongs to
//! whoever consumes the normalized order.

use super::order_entry::{CmeOrder, OuchOrder, PillarOrder, ORDER_ENTRY_SIZE};
use super::SYMBOL_LEN;

/// Source protocol of a normalized order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    Ouch = 1,
    Pillar = 2,
    Cme = 3,
}

impl Protocol {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ouch => "OUCH",
            Self::Pillar => "Pillar",
            Self::Cme => "CME",
        }
    }
}

/// How the matching engine decides which decoder to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMode {
    /// Inspect each message and pick the protocol per record.
    Auto,
    /// Always decode as the given protocol.
    Fixed(Protocol),
}

impl std::str::FromStr for ProtocolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "ouch" => Ok(Self::Fixed(Protocol::Ouch)),
            "pillar" => Ok(Self::Fixed(Protocol::Pillar)),
            "cme" => Ok(Self::Fixed(Protocol::Cme)),
            other => Err(format!(
                "invalid protocol '{other}' (expected auto|ouch|pillar|cme)"
            )),
        }
    }
}

/// Protocol-neutral order representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedOrder {
    pub order_id: u64,
    pub symbol: [u8; SYMBOL_LEN],
    pub quantity: u32,
    /// 1/10000 dollars.
    pub price: u32,
    pub side: u8,
    pub time_in_force: u8,
    pub order_type: u8,
    pub capacity: u8,
    pub protocol: Protocol,
}

impl NormalizedOrder {
    /// Re-encode as the 64-byte wire form of the order's own protocol.
    pub fn encode_wire(&self, out: &mut [u8]) {
        match self.protocol {
            Protocol::Ouch => self.to_ouch().encode(out),
            Protocol::Pillar => self.to_pillar().encode(out),
            Protocol::Cme => self.to_cme().encode(out),
        }
    }

    pub fn to_ouch(&self) -> OuchOrder {
        OuchOrder {
            client_order_id: self.order_id,
            symbol: self.symbol,
            shares: self.quantity,
            price: self.price,
            side: self.side,
            time_in_force: self.time_in_force,
            order_type: self.order_type,
            capacity: self.capacity,
            reserved: 0,
        }
    }

    pub fn to_pillar(&self) -> PillarOrder {
        PillarOrder {
            client_order_id: self.order_id,
            symbol: self.symbol,
            shares: self.quantity,
            price: self.price,
            side: self.side,
            order_type: self.order_type,
            tif: self.time_in_force,
        }
    }

    pub fn to_cme(&self) -> CmeOrder {
        CmeOrder {
            client_order_id: self.order_id,
            symbol: self.symbol,
            quantity: self.quantity,
            price: self.price,
            side: self.side,
            order_type: self.order_type,
            tif: self.time_in_force,
        }
    }
}

/// Map an OUCH enter-order onto the normalized form.
pub fn decode_ouch(msg: &OuchOrder) -> NormalizedOrder {
    NormalizedOrder {
        order_id: msg.client_order_id,
        symbol: msg.symbol,
        quantity: msg.shares,
        price: msg.price,
        side: msg.side,
        time_in_force: msg.time_in_force,
        order_type: msg.order_type,
        capacity: msg.capacity,
        protocol: Protocol::Ouch,
    }
}

/// Map a Pillar order onto the normalized form. Pillar's wire has no
/// capacity field; agency is the default.
pub fn decode_pillar(msg: &PillarOrder) -> NormalizedOrder {
    NormalizedOrder {
        order_id: msg.client_order_id,
        symbol: msg.symbol,
        quantity: msg.shares,
        price: msg.price,
        side: msg.side,
        time_in_force: msg.tif,
        order_type: msg.order_type,
        capacity: b'A',
        protocol: Protocol::Pillar,
    }
}

/// Map a CME order onto the normalized form. CME flow is treated as
/// principal by default.
pub fn decode_cme(msg: &CmeOrder) -> NormalizedOrder {
    NormalizedOrder {
        order_id: msg.client_order_id,
        symbol: msg.symbol,
        quantity: msg.quantity,
        price: msg.price,
        side: msg.side,
        time_in_force: msg.tif,
        order_type: msg.order_type,
        capacity: b'P',
        protocol: Protocol::Cme,
    }
}

/// Decide which protocol a raw 64-byte record belongs to.
///
/// The order_type byte settles most cases, but it does not sit at one
/// offset: OUCH carries it at byte 26 (after time-in-force), Pillar and
/// CME at byte 25. `'L'`/`'M'` at 25 means Pillar-or-CME; futures symbols
/// give CME away — position 2 carries a month code (F through Z) and
/// position 3 a year digit, e.g. `ESZ4`. OUCH always writes `'O'` at 26,
/// and no OUCH time-in-force value collides with `'L'`/`'M'` at 25.
/// Anything unrecognized falls back to Pillar.
pub fn detect_protocol(buf: &[u8]) -> Protocol {
    debug_assert!(buf.len() >= ORDER_ENTRY_SIZE);
    match buf[25] {
        b'L' | b'M' => {
            let symbol = &buf[8..16];
            let month = symbol[2];
            let year = symbol[3];
            if (b'F'..=b'Z').contains(&month) && year.is_ascii_digit() {
                Protocol::Cme
            } else {
                Protocol::Pillar
            }
        }
        _ if buf[26] == b'O' => Protocol::Ouch,
        _ => Protocol::Pillar,
    }
}

/// Decode a raw 64-byte order-entry record under the given mode.
pub fn decode(mode: ProtocolMode, buf: &[u8]) -> NormalizedOrder {
    let protocol = match mode {
        ProtocolMode::Auto => detect_protocol(buf),
        ProtocolMode::Fixed(p) => p,
    };
    match protocol {
        Protocol::Ouch => decode_ouch(&OuchOrder::decode(buf)),
        Protocol::Pillar => decode_pillar(&PillarOrder::decode(buf)),
        Protocol::Cme => decode_cme(&CmeOrder::decode(buf)),
    }
}
