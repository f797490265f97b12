//! Fluent construction of [`Settings`] and whole configuration files.
//!
//! # Example
//!
//! ```rust
//! use snarl::settings::builder::SettingsBuilder;
//!
//! let config = SettingsBuilder::new()
//!     .lag(100)
//!     .with_lag_variation(20)
//!     .drop(5.0)
//!     .rate_limit(8)
//!     .into_config();
//!
//! assert_eq!(config.enabled.len(), 3);
//! assert_eq!(config.settings.lag.time_ms, 100);
//! ```

use crate::network::modules::registry::ModuleKind;
use crate::network::types::probability::Probability;
use crate::settings::config_file::ConfigFile;
use crate::settings::manipulation::Settings;
use crate::settings::processing::ProcessingOptions;

/// Builder for `Settings` that also remembers which modules were configured,
/// so the result can be armed directly.
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
    enabled: Vec<ModuleKind>,
    processing: ProcessingOptions,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from existing settings with no module marked enabled.
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    fn enable(&mut self, kind: ModuleKind) {
        if !self.enabled.contains(&kind) {
            self.enabled.push(kind);
        }
    }

    /// Enables lag with the given lag time in milliseconds.
    pub fn lag(mut self, time_ms: u64) -> Self {
        self.settings.lag.time_ms = time_ms;
        self.enable(ModuleKind::Lag);
        self
    }

    pub fn with_lag_variation(mut self, variation_ms: u64) -> Self {
        self.settings.lag.variation_ms = variation_ms;
        self
    }

    /// Enables packet dropping with the given chance as a percentage (0-100).
    pub fn drop(mut self, chance: f64) -> Self {
        self.settings.drop.probability = Probability::from_percent(chance);
        self.enable(ModuleKind::Drop);
        self
    }

    /// Enables throttling with cycles of `timeframe_ms`, started with `chance` percent.
    pub fn throttle(mut self, timeframe_ms: u64, chance: f64) -> Self {
        self.settings.throttle.timeframe_ms = timeframe_ms;
        self.settings.throttle.probability = Probability::from_percent(chance);
        self.enable(ModuleKind::Throttle);
        self
    }

    pub fn with_throttle_drop(mut self, drop_throttled: bool) -> Self {
        self.settings.throttle.drop_throttled = drop_throttled;
        self
    }

    /// Enables duplication: `count` total packets for each duplicated one.
    pub fn duplicate(mut self, count: usize, chance: f64) -> Self {
        self.settings.duplicate.count = count;
        self.settings.duplicate.probability = Probability::from_percent(chance);
        self.enable(ModuleKind::Duplicate);
        self
    }

    pub fn reorder(mut self, chance: f64) -> Self {
        self.settings.reorder.probability = Probability::from_percent(chance);
        self.enable(ModuleKind::Reorder);
        self
    }

    pub fn tamper(mut self, chance: f64) -> Self {
        self.settings.tamper.probability = Probability::from_percent(chance);
        self.enable(ModuleKind::Tamper);
        self
    }

    /// Sets the fraction of payload bytes tampered, as a percentage.
    pub fn with_tamper_amount(mut self, amount: f64) -> Self {
        self.settings.tamper.amount = Probability::from_percent(amount);
        self
    }

    pub fn with_tamper_checksums(mut self, redo_checksum: bool) -> Self {
        self.settings.tamper.redo_checksum = redo_checksum;
        self
    }

    pub fn reset(mut self, chance: f64) -> Self {
        self.settings.reset.probability = Probability::from_percent(chance);
        self.enable(ModuleKind::Reset);
        self
    }

    /// Enables the static bandwidth cap in KB/s.
    pub fn bandwidth(mut self, limit_kbps: usize) -> Self {
        self.settings.bandwidth.limit_kbps = limit_kbps;
        self.enable(ModuleKind::Bandwidth);
        self
    }

    /// Enables the rate limiter with a cap in Mbps.
    pub fn rate_limit(mut self, data_rate_mbps: u32) -> Self {
        self.settings.rate_limit.data_rate_mbps = data_rate_mbps;
        self.enable(ModuleKind::RateLimit);
        self
    }

    /// Sets the rate limiter's base delay and variation in milliseconds.
    pub fn with_rate_delay(mut self, delay_ms: u64, variation_ms: u64) -> Self {
        self.settings.rate_limit.delay_ms = delay_ms;
        self.settings.rate_limit.variation_ms = variation_ms;
        self
    }

    /// Restricts every configured module to one traffic direction.
    pub fn directions(mut self, inbound: bool, outbound: bool) -> Self {
        let s = &mut self.settings;
        for (i, o) in [
            (&mut s.lag.inbound, &mut s.lag.outbound),
            (&mut s.drop.inbound, &mut s.drop.outbound),
            (&mut s.throttle.inbound, &mut s.throttle.outbound),
            (&mut s.duplicate.inbound, &mut s.duplicate.outbound),
            (&mut s.reorder.inbound, &mut s.reorder.outbound),
            (&mut s.tamper.inbound, &mut s.tamper.outbound),
            (&mut s.reset.inbound, &mut s.reset.outbound),
            (&mut s.bandwidth.inbound, &mut s.bandwidth.outbound),
            (&mut s.rate_limit.inbound, &mut s.rate_limit.outbound),
        ] {
            *i = inbound;
            *o = outbound;
        }
        self
    }

    pub fn tick_interval(mut self, tick_interval_ms: u64) -> Self {
        self.processing.tick_interval_ms = tick_interval_ms;
        self
    }

    /// Forgets every enabled module, keeping the parameters.
    pub fn clear(mut self) -> Self {
        self.enabled.clear();
        self
    }

    pub fn enabled_modules(&self) -> &[ModuleKind] {
        &self.enabled
    }

    pub fn build(self) -> Settings {
        self.settings
    }

    /// Produces a complete configuration file, enabled modules in pipeline order.
    pub fn into_config(mut self) -> ConfigFile {
        self.enabled.sort_by_key(|kind| kind.order());
        ConfigFile {
            settings: self.settings,
            enabled: self.enabled,
            processing: self.processing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = SettingsBuilder::new();
        assert!(builder.enabled_modules().is_empty());
        assert_eq!(builder.build(), Settings::default());
    }

    #[test]
    fn test_builder_drop() {
        let settings = SettingsBuilder::new().drop(50.0).build();
        assert!((settings.drop.probability.value() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_builder_multiple_modules_in_pipeline_order() {
        let config = SettingsBuilder::new()
            .rate_limit(4)
            .drop(25.0)
            .lag(50)
            .lag(60)
            .into_config();

        assert_eq!(
            config.enabled,
            vec![ModuleKind::Lag, ModuleKind::Drop, ModuleKind::RateLimit]
        );
        assert_eq!(config.settings.lag.time_ms, 60);
    }

    #[test]
    fn test_builder_clear_keeps_parameters() {
        let builder = SettingsBuilder::new().drop(50.0).lag(100).clear();
        assert!(builder.enabled_modules().is_empty());
        assert_eq!(builder.build().lag.time_ms, 100);
    }

    #[test]
    fn test_directions() {
        let settings = SettingsBuilder::new().directions(false, true).build();
        assert!(!settings.rate_limit.inbound);
        assert!(settings.rate_limit.outbound);
        assert!(!settings.tamper.inbound);
    }
}
