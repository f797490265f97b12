use crate::error::{Result, SnarlError};
use crate::settings::bandwidth::{BandwidthOptions, MAX_LIMIT_KBPS};
use crate::settings::drop::DropOptions;
use crate::settings::duplicate::{DuplicateOptions, MAX_DUPLICATE_COUNT, MIN_DUPLICATE_COUNT};
use crate::settings::lag::{LagOptions, MAX_LAG_MS};
use crate::settings::rate_limit::{RateLimitOptions, MAX_BUFFER_SIZE, MAX_DATA_RATE_MBPS};
use crate::settings::reorder::ReorderOptions;
use crate::settings::reset::ResetOptions;
use crate::settings::tamper::TamperOptions;
use crate::settings::throttle::{ThrottleOptions, MAX_TIMEFRAME_MS};
use clap::Args;
use serde::{Deserialize, Serialize};

/// Tunable parameters of every shaping module.
///
/// Whether a module runs is not part of its settings; that is tracked by the
/// atomic module switches so it can be flipped without taking the settings lock.
#[derive(Args, Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Controls packet lag
    #[command(flatten)]
    pub lag: LagOptions,

    /// Controls random packet dropping
    #[command(flatten)]
    pub drop: DropOptions,

    /// Controls throttle cycles
    #[command(flatten)]
    pub throttle: ThrottleOptions,

    /// Controls packet duplication
    #[command(flatten)]
    pub duplicate: DuplicateOptions,

    /// Controls packet reordering
    #[command(flatten)]
    pub reorder: ReorderOptions,

    /// Controls payload tampering
    #[command(flatten)]
    pub tamper: TamperOptions,

    /// Controls TCP reset injection
    #[command(flatten)]
    pub reset: ResetOptions,

    /// Controls the static bandwidth cap
    #[command(flatten)]
    pub bandwidth: BandwidthOptions,

    /// Controls the rate limiter
    #[command(flatten)]
    pub rate_limit: RateLimitOptions,
}

impl Settings {
    /// Checks every parameter against its documented range.
    ///
    /// Used by the configuration layer when loading or applying settings.
    /// The shaping modules clamp defensively on their own, so a value that
    /// slips past this check cannot overflow anything.
    pub fn validate(&self) -> Result<()> {
        check_range("lag.time_ms", self.lag.time_ms, 0, MAX_LAG_MS)?;
        check_range("lag.variation_ms", self.lag.variation_ms, 0, MAX_LAG_MS)?;
        check_range(
            "throttle.timeframe_ms",
            self.throttle.timeframe_ms,
            0,
            MAX_TIMEFRAME_MS,
        )?;
        check_range(
            "duplicate.count",
            self.duplicate.count as u64,
            MIN_DUPLICATE_COUNT as u64,
            MAX_DUPLICATE_COUNT as u64,
        )?;
        check_range(
            "bandwidth.limit_kbps",
            self.bandwidth.limit_kbps as u64,
            0,
            MAX_LIMIT_KBPS as u64,
        )?;
        check_range("rate_limit.delay_ms", self.rate_limit.delay_ms, 0, MAX_LAG_MS)?;
        check_range(
            "rate_limit.variation_ms",
            self.rate_limit.variation_ms,
            0,
            MAX_LAG_MS,
        )?;
        check_range(
            "rate_limit.data_rate_mbps",
            u64::from(self.rate_limit.data_rate_mbps),
            0,
            u64::from(MAX_DATA_RATE_MBPS),
        )?;
        check_range(
            "rate_limit.buffer_size",
            self.rate_limit.buffer_size as u64,
            1,
            MAX_BUFFER_SIZE as u64,
        )?;
        check_range(
            "rate_limit.flush_batch",
            self.rate_limit.flush_batch as u64,
            0,
            self.rate_limit.buffer_size as u64,
        )?;
        Ok(())
    }
}

fn check_range(name: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        return Err(SnarlError::Config(format!(
            "{} = {} is outside {}..={}",
            name, value, min, max
        )));
    }
    Ok(())
}
