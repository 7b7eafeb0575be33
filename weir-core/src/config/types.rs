use serde::{Deserialize, Serialize};

/// Replayer configuration.
///
/// Every key is optional in the file; defaults are supplied by the
/// loader. `mode` selects the pacing rule; the remaining rule keys
/// install additional rules only when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Pacing mode: "continuous", "burst" or "wave".
    pub mode: String,

    /// Messages per second for continuous mode.
    pub rate_msgs_per_sec: usize,

    /// Messages per burst for burst mode.
    pub burst_size: usize,

    /// Pause between bursts, in milliseconds.
    pub burst_interval_ms: u64,

    /// Wave period, in milliseconds.
    pub period_ms: u64,

    /// Wave trough rate, messages per second.
    pub min_rate: usize,

    /// Wave crest rate, messages per second.
    pub max_rate: usize,

    /// Scale every delay by this factor (2.0 = twice as fast).
    #[serde(default)]
    pub speed_factor: Option<f64>,

    /// Install a safety rate limit at this many messages per second.
    #[serde(default)]
    pub max_rate_limit: Option<usize>,

    /// Install chaos packet loss with this probability, in [0, 1].
    #[serde(default)]
    pub packet_loss_rate: Option<f64>,

    /// Install chaos jitter up to this many microseconds per message.
    #[serde(default)]
    pub max_jitter_us: Option<u64>,

    /// Replay the capture indefinitely.
    pub loop_forever: bool,

    /// Egress: "udp_multicast", "tcp", "file", "console" or "null".
    pub output: String,

    /// Multicast group for udp_multicast output.
    pub multicast_address: String,

    /// Multicast UDP port.
    pub multicast_port: u16,

    /// Multicast TTL (1 keeps traffic on the local segment).
    pub multicast_ttl: u32,

    /// Listen port for tcp output.
    pub tcp_port: u16,

    /// Path for file output.
    pub output_file: String,
}
