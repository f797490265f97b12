use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

/// Bytes per second in one Mbps of data-rate cap.
pub const BYTES_PER_MBPS: u64 = 131_072;

pub const DEFAULT_DATA_RATE_MBPS: u32 = 1024;
pub const MAX_DATA_RATE_MBPS: u32 = 65_535;

/// Default and maximum number of packets the limiter may hold.
pub const DEFAULT_BUFFER_SIZE: usize = 2_000;
pub const MAX_BUFFER_SIZE: usize = 10_000;

/// Default number of packets force-released when the buffer fills up.
pub const DEFAULT_FLUSH_BATCH: usize = 800;

/// Options for the rate limiter.
///
/// Packets are delayed by `delay_ms ± variation_ms` and then released only
/// while the measured throughput stays under `data_rate_mbps`.
#[derive(Args, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RateLimitOptions {
    /// Whether to apply to inbound (download) traffic
    #[arg(long = "rate-inbound", id = "rate-inbound", default_value_t = true, action = ArgAction::Set)]
    pub inbound: bool,

    /// Whether to apply to outbound (upload) traffic
    #[arg(long = "rate-outbound", id = "rate-outbound", default_value_t = true, action = ArgAction::Set)]
    pub outbound: bool,

    /// Base queueing delay in milliseconds (0-15000)
    #[arg(long = "rate-delay", id = "rate-delay", default_value_t = 0)]
    pub delay_ms: u64,

    /// Random variation around the base delay in milliseconds (0-15000)
    #[arg(long = "rate-variation", id = "rate-variation", default_value_t = 0)]
    pub variation_ms: u64,

    /// Data rate cap in Mbps (0-65535)
    #[arg(long = "rate-mbps", id = "rate-mbps", default_value_t = DEFAULT_DATA_RATE_MBPS)]
    pub data_rate_mbps: u32,

    /// Maximum number of packets held before an overflow flush (1-10000)
    #[arg(long = "rate-buffer", id = "rate-buffer", default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Packets force-released when the buffer is full
    #[arg(long = "rate-flush-batch", id = "rate-flush-batch", default_value_t = DEFAULT_FLUSH_BATCH)]
    pub flush_batch: usize,
}

impl RateLimitOptions {
    /// Cap in bytes per second, with the Mbps value clamped to its range.
    pub fn cap_bytes_per_sec(&self) -> u64 {
        u64::from(self.data_rate_mbps.min(MAX_DATA_RATE_MBPS)) * BYTES_PER_MBPS
    }
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            inbound: true,
            outbound: true,
            delay_ms: 0,
            variation_ms: 0,
            data_rate_mbps: DEFAULT_DATA_RATE_MBPS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_batch: DEFAULT_FLUSH_BATCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RateLimitOptions::default();
        assert_eq!(options.cap_bytes_per_sec(), 1024 * 131_072);
        assert_eq!(options.buffer_size, 2_000);
        assert_eq!(options.flush_batch, 800);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let options: RateLimitOptions = toml::from_str("data_rate_mbps = 8\noutbound = false").unwrap();
        assert_eq!(options.cap_bytes_per_sec(), 8 * 131_072);
        assert!(options.inbound);
        assert!(!options.outbound);
        assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_cap_is_clamped() {
        let options = RateLimitOptions {
            data_rate_mbps: u32::MAX,
            ..RateLimitOptions::default()
        };
        assert_eq!(options.cap_bytes_per_sec(), 65_535 * BYTES_PER_MBPS);
    }
}
