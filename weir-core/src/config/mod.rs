//! Replayer configuration: typed keys, file + environment loading,
//! validation, and construction of the rule set and sender it describes.

mod types;

pub use types::ReplayConfig;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config as ConfigLoader, Environment, File};

use crate::net::{
    ConsoleSender, FileSender, NullSender, Sender, TcpSender, UdpMulticastSender,
};
use crate::replay::{
    BurstRule, ContinuousRule, JitterRule, PacketLossRule, PlaybackRule, RateLimitRule,
    SpeedFactorRule, WaveRule,
};

impl ReplayConfig {
    /// Load configuration from a file (JSON or TOML by extension) with
    /// `WEIR_`-prefixed environment variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();

        let config = Self::builder_with_defaults()?
            .add_source(File::from(config_path))
            .add_source(Environment::with_prefix("WEIR").separator("__"))
            .build()
            .with_context(|| format!("loading configuration {}", config_path.display()))?;

        let cfg: ReplayConfig = config
            .try_deserialize()
            .context("deserializing configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The built-in defaults (continuous 10k msgs/sec to the console),
    /// still subject to environment overrides.
    pub fn load_defaults() -> Result<Self> {
        let config = Self::builder_with_defaults()?
            .add_source(Environment::with_prefix("WEIR").separator("__"))
            .build()
            .context("building default configuration")?;

        let cfg: ReplayConfig = config
            .try_deserialize()
            .context("deserializing configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn builder_with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(ConfigLoader::builder()
            .set_default("mode", "continuous")?
            .set_default("rate_msgs_per_sec", 10_000)?
            .set_default("burst_size", 5_000)?
            .set_default("burst_interval_ms", 100)?
            .set_default("period_ms", 10_000)?
            .set_default("min_rate", 1_000)?
            .set_default("max_rate", 100_000)?
            .set_default("loop_forever", false)?
            .set_default("output", "console")?
            .set_default("multicast_address", "239.255.0.1")?
            .set_default("multicast_port", 12345)?
            .set_default("multicast_ttl", 1)?
            .set_default("tcp_port", 12345)?
            .set_default("output_file", "replay_out.bin")?)
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<()> {
        match self.mode.as_str() {
            "continuous" | "burst" | "wave" => {}
            other => anyhow::bail!("invalid mode '{other}', must be continuous, burst or wave"),
        }

        match self.output.as_str() {
            "udp_multicast" | "tcp" | "file" | "console" | "null" => {}
            other => anyhow::bail!(
                "invalid output '{other}', must be udp_multicast, tcp, file, console or null"
            ),
        }

        if self.rate_msgs_per_sec == 0 {
            anyhow::bail!("rate_msgs_per_sec must be positive");
        }
        if self.burst_size == 0 {
            anyhow::bail!("burst_size must be positive");
        }
        if self.min_rate == 0 || self.max_rate == 0 {
            anyhow::bail!("wave rates must be positive");
        }
        if self.min_rate > self.max_rate {
            anyhow::bail!(
                "min_rate ({}) cannot exceed max_rate ({})",
                self.min_rate,
                self.max_rate
            );
        }

        if let Some(factor) = self.speed_factor {
            if factor <= 0.0 {
                anyhow::bail!("speed_factor must be positive");
            }
        }
        if let Some(limit) = self.max_rate_limit {
            if limit == 0 {
                anyhow::bail!("max_rate_limit must be positive");
            }
        }
        if let Some(rate) = self.packet_loss_rate {
            if !(0.0..=1.0).contains(&rate) {
                anyhow::bail!("packet_loss_rate must be within [0, 1], got {rate}");
            }
        }

        if self.multicast_address.parse::<std::net::Ipv4Addr>().is_err() {
            anyhow::bail!("invalid multicast_address '{}'", self.multicast_address);
        }

        Ok(())
    }

    /// Multicast group as an address.
    pub fn multicast_group(&self) -> std::net::Ipv4Addr {
        // validate() has already vetted the string.
        self.multicast_address
            .parse()
            .expect("validated multicast address")
    }

    /// Instantiate the rules this configuration asks for, mode rule
    /// first, then the optional timing/safety/chaos additions.
    pub fn build_rules(&self) -> Vec<Box<dyn PlaybackRule>> {
        let mut rules: Vec<Box<dyn PlaybackRule>> = Vec::new();

        match self.mode.as_str() {
            "burst" => {
                tracing::info!(
                    burst_size = self.burst_size,
                    interval_ms = self.burst_interval_ms,
                    "configured burst mode"
                );
                rules.push(Box::new(BurstRule::new(
                    self.burst_size,
                    Duration::from_millis(self.burst_interval_ms),
                )));
            }
            "wave" => {
                tracing::info!(
                    period_ms = self.period_ms,
                    min_rate = self.min_rate,
                    max_rate = self.max_rate,
                    "configured wave mode"
                );
                rules.push(Box::new(WaveRule::new(
                    Duration::from_millis(self.period_ms),
                    self.min_rate,
                    self.max_rate,
                )));
            }
            _ => {
                tracing::info!(rate = self.rate_msgs_per_sec, "configured continuous mode");
                rules.push(Box::new(ContinuousRule::new(self.rate_msgs_per_sec)));
            }
        }

        if let Some(factor) = self.speed_factor {
            tracing::info!(factor, "configured speed factor");
            rules.push(Box::new(SpeedFactorRule::new(factor)));
        }
        if let Some(limit) = self.max_rate_limit {
            tracing::info!(limit, "configured rate limit (safety)");
            rules.push(Box::new(RateLimitRule::new(limit)));
        }
        if let Some(rate) = self.packet_loss_rate {
            tracing::info!(pct = rate * 100.0, "configured packet loss (chaos)");
            rules.push(Box::new(PacketLossRule::new(rate)));
        }
        if let Some(jitter_us) = self.max_jitter_us {
            tracing::info!(jitter_us, "configured jitter (chaos)");
            rules.push(Box::new(JitterRule::new(Duration::from_micros(jitter_us))));
        }

        rules
    }

    /// Construct the sender this configuration names. TCP blocks here
    /// until its one client connects.
    pub fn build_sender(&self) -> Result<Box<dyn Sender>> {
        let sender: Box<dyn Sender> = match self.output.as_str() {
            "udp_multicast" => Box::new(UdpMulticastSender::new(
                self.multicast_group(),
                self.multicast_port,
                self.multicast_ttl,
            )?),
            "tcp" => Box::new(TcpSender::new(self.tcp_port)?),
            "file" => Box::new(FileSender::new(&self.output_file)?),
            "null" => Box::new(NullSender::new()),
            _ => Box::new(ConsoleSender::new()),
        };
        Ok(sender)
    }
}
