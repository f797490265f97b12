//! Periodic status refresh for display.

use crate::network::modules::stats::rate_limit_stats::RateLimitStats;
use crate::network::modules::stats::util::ewma::Ewma;
use crate::network::processing::module_state::ModuleSwitches;
use serde::Serialize;

/// Smoothing factor applied to the displayed data rate.
pub const STATUS_SMOOTHING: f64 = 0.2;

/// Values shown in the status line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Smoothed rate limiter throughput, bytes per second / 128
    pub data_rate_kbps: u64,
    pub queue_delay_ms: u64,
}

impl StatusSnapshot {
    pub fn status_line(&self) -> String {
        format!(
            "data rate (Kbps)={}    queue delay (ms)={}",
            self.data_rate_kbps, self.queue_delay_ms
        )
    }
}

/// Smooths the rate limiter's figures and clears the activity indicators.
#[derive(Debug)]
pub struct StatusMonitor {
    data_rate: Ewma,
    latest: StatusSnapshot,
}

impl StatusMonitor {
    pub fn new() -> Self {
        Self {
            data_rate: Ewma::new(STATUS_SMOOTHING),
            latest: StatusSnapshot::default(),
        }
    }

    /// Folds the current rate limiter status into the display values and
    /// demotes every active switch back to armed.
    pub fn refresh(&mut self, stats: &RateLimitStats, switches: &ModuleSwitches) -> StatusSnapshot {
        let smoothed = self.data_rate.update(stats.data_rate_kbps() as f64);
        self.latest = StatusSnapshot {
            data_rate_kbps: smoothed.max(0.0).round() as u64,
            queue_delay_ms: stats.queue_delay_whole_ms(),
        };
        switches.demote_active();
        self.latest.clone()
    }

    pub fn latest(&self) -> &StatusSnapshot {
        &self.latest
    }

    /// Forgets the smoothed history, used when the engine restarts.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self::new()
    }
}
