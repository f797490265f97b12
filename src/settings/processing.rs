use serde::{Deserialize, Serialize};

/// Bounds for the scheduler tick interval, in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 1;
pub const MAX_TICK_INTERVAL_MS: u64 = 100;

/// Timing of the scheduler loop.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProcessingOptions {
    /// Interval between pipeline ticks
    pub tick_interval_ms: u64,

    /// Run the status refresh every this many ticks
    pub status_every_ticks: u32,
}

impl ProcessingOptions {
    /// Tick interval clamped into its supported range.
    pub fn effective_tick_ms(&self) -> u64 {
        self.tick_interval_ms
            .clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS)
    }

    /// Status refresh period in ticks, at least 1.
    pub fn effective_status_every(&self) -> u32 {
        self.status_every_ticks.max(1)
    }
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            tick_interval_ms: 40,
            status_every_ticks: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_interval_is_clamped() {
        let mut options = ProcessingOptions::default();
        assert_eq!(options.effective_tick_ms(), 40);

        options.tick_interval_ms = 0;
        assert_eq!(options.effective_tick_ms(), 1);

        options.tick_interval_ms = 5_000;
        assert_eq!(options.effective_tick_ms(), 100);
    }
}
