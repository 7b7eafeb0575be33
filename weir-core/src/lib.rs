//! weir — a simulated exchange pipeline.
//!
//! A weir is a low barrier across a stream that shapes its flow, which is
//! what this system does to market data: a generator writes binary
//! exchange messages to a capture file, a replayer streams them out under
//! a priority-ordered rules pipeline, a client algorithm trades on them
//! across three pinned cores, and a matching stub fills the orders.
//!
//! ## Architecture
//!
//! ```text
//! md_generator ──▶ capture file ──▶ Replayer ──▶ RulesEngine ──▶ Sender ──▶ UDP/TCP
//!                                                                            │
//!                         MD receiver (core 0) ◀── UDP multicast ◀───────────┘
//!                               │ SpscRing
//!                               ▼
//!                         Trading logic (core 1) ──▶ orders over TCP ──▶ MatchingEngine
//!                               ▲ SpscRing                                   │
//!                               │                                            │
//!                         Exec receiver (core 2) ◀── execution reports ◀─────┘
//! ```
//!
//! The streaming middle is the point of the exercise:
//!
//! - [`ring`] — lock-free SPSC ring buffers with drop and high-water
//!   accounting; the only inter-thread conduits.
//! - [`wire`] — fixed-layout binary codecs for seven market-data records,
//!   three order-entry protocols, the execution report, and the
//!   protocol-normalization adapter.
//! - [`feed`] — datagram parsing into typed messages, and capture files.
//! - [`replay`] — the priority-ordered rules pipeline (Safety → Control →
//!   Timing → Chaos), message-priority classifiers, and the replayer.
//! - [`perf`] — CPU pinning, pinned workers with trapped panics, and the
//!   tick-to-trade latency tracker.
//! - [`net`] — multicast/TCP/file/console/null senders and the zero-copy
//!   receive paths.
//! - [`matching`] — the echo-as-filled matching stub.
//! - [`pipeline`] — the three-core client algorithm wiring.
//!
//! ## Hot-path rules
//!
//! No locks, no allocation, no blocking sends. Rings drop (and count)
//! rather than stall; the one drop-intolerant ring (execution reports)
//! spins with CPU pause hints and reports a critical condition after a
//! grace period instead of blocking the receive syscall loop.

pub mod config;
pub mod feed;
pub mod matching;
pub mod net;
pub mod perf;
pub mod pipeline;
pub mod replay;
pub mod ring;
pub mod utils;
pub mod wire;

pub use anyhow::{Error, Result};

/// Convenient imports for binaries and tests.
pub mod prelude {
    pub use crate::config::ReplayConfig;
    pub use crate::feed::{parse_packet, Capture, CaptureWriter, PacketError};
    pub use crate::matching::MatchingEngine;
    pub use crate::net::{
        ConsoleSender, FileSender, NullSender, Sender, TcpClient, TcpSender,
        UdpMulticastReceiver, UdpMulticastSender,
    };
    pub use crate::perf::{
        cpu_pause, pin_to_core, CorePin, HighResClock, LatencyStats, LatencyTracker,
        PinnedWorker, ScopedLatency,
    };
    pub use crate::pipeline::{ClientPipeline, PipelineConfig, PipelineReport, PipelineStats};
    pub use crate::replay::{
        Decision, MessagePriority, Outcome, PlaybackRule, Replayer, ReplayState, RulePriority,
        RulesEngine,
    };
    pub use crate::ring::SpscRing;
    pub use crate::wire::{
        pad_symbol, symbol_str, ExecStatus, ExecutionReport, MarketDataMessage, NormalizedOrder,
        Protocol, ProtocolMode,
    };
    pub use crate::{Error, Result};
}
