//! Sliding-window throughput estimation.
//!
//! [`RateStatsWindow`] keeps a ring of `window_size` buckets, each covering
//! `bucket_ms` milliseconds of monotonic time. Samples land in the bucket that
//! owns their timestamp; buckets that fall out of the window are zeroed before
//! they are reused, so a reading never sees stale history.

use log::debug;

/// Bytes-per-second conversion factor for millisecond timestamps.
const MS_PER_SECOND: u64 = 1000;

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    sum: u64,
    samples: u32,
}

/// Bucketed bytes-per-second estimator over a fixed horizon.
#[derive(Debug, Clone)]
pub struct RateStatsWindow {
    buckets: Vec<Bucket>,
    bucket_ms: u64,
    initialized: bool,
    /// Slot number (timestamp / bucket_ms) of the oldest retained bucket
    oldest_slot: u64,
    /// Latest slot observed through `update` or `calculate`
    newest_slot: u64,
    /// Total bytes ever recorded, for diagnostics
    accumulated_count: u64,
    sample_count: u64,
}

impl RateStatsWindow {
    /// Creates a window of `window_size` buckets of `bucket_ms` each.
    ///
    /// Both values are clamped to at least 1.
    ///
    /// # Example
    ///
    /// ```
    /// use snarl::network::modules::stats::rate_stats::RateStatsWindow;
    ///
    /// let mut window = RateStatsWindow::new(500, 1);
    /// assert_eq!(window.calculate(0), 0);
    ///
    /// window.update(1_000, 0);
    /// window.update(1_000, 9);
    /// // 2000 bytes over 10 ms of active window
    /// assert_eq!(window.calculate(9), 200_000);
    /// ```
    pub fn new(window_size: usize, bucket_ms: u64) -> Self {
        Self {
            buckets: vec![Bucket::default(); window_size.max(1)],
            bucket_ms: bucket_ms.max(1),
            initialized: false,
            oldest_slot: 0,
            newest_slot: 0,
            accumulated_count: 0,
            sample_count: 0,
        }
    }

    /// Retained history in milliseconds.
    pub fn horizon_ms(&self) -> u64 {
        self.buckets.len() as u64 * self.bucket_ms
    }

    /// Records `byte_count` bytes observed at `now_ms`.
    ///
    /// Samples older than the retained window are ignored.
    pub fn update(&mut self, byte_count: usize, now_ms: u64) {
        let slot = now_ms / self.bucket_ms;

        if !self.initialized {
            self.initialized = true;
            self.oldest_slot = slot;
            self.newest_slot = slot;
        } else {
            self.roll_forward(slot);
            if slot < self.oldest_slot {
                debug!(
                    "Ignoring rate sample at {} ms, window starts at slot {}",
                    now_ms, self.oldest_slot
                );
                return;
            }
        }

        let index = self.index_of(slot);
        let bucket = &mut self.buckets[index];
        bucket.sum += byte_count as u64;
        bucket.samples += 1;

        self.accumulated_count += byte_count as u64;
        self.sample_count += 1;
    }

    /// Mean rate in bytes per second over the retained interval ending at `now_ms`.
    ///
    /// Returns 0 before the first sample and while the window spans fewer than
    /// two buckets.
    pub fn calculate(&mut self, now_ms: u64) -> u64 {
        if !self.initialized {
            return 0;
        }

        self.roll_forward(now_ms / self.bucket_ms);

        let active_slots = self.newest_slot - self.oldest_slot + 1;
        if active_slots < 2 {
            return 0;
        }

        let sum: u64 = self.buckets.iter().map(|bucket| bucket.sum).sum();
        sum * MS_PER_SECOND / (active_slots * self.bucket_ms)
    }

    /// Total bytes recorded since creation or the last reset.
    pub fn accumulated_count(&self) -> u64 {
        self.accumulated_count
    }

    /// Number of samples recorded since creation or the last reset.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Number of samples currently retained in the window.
    #[cfg(test)]
    pub fn samples_in_window(&self) -> u64 {
        self.buckets
            .iter()
            .map(|bucket| u64::from(bucket.samples))
            .sum()
    }

    /// Discards every sample and returns to the uninitialized state.
    pub fn reset(&mut self) {
        self.buckets.fill(Bucket::default());
        self.initialized = false;
        self.oldest_slot = 0;
        self.newest_slot = 0;
        self.accumulated_count = 0;
        self.sample_count = 0;
    }

    fn index_of(&self, slot: u64) -> usize {
        (slot % self.buckets.len() as u64) as usize
    }

    /// Advances the window so that `slot` is its newest bucket, zeroing every
    /// bucket that falls out of range.
    fn roll_forward(&mut self, slot: u64) {
        if slot <= self.newest_slot {
            return;
        }
        self.newest_slot = slot;

        let window = self.buckets.len() as u64;
        let new_oldest = (slot + 1).saturating_sub(window).max(self.oldest_slot);
        if new_oldest == self.oldest_slot {
            return;
        }

        if new_oldest - self.oldest_slot >= window {
            self.buckets.fill(Bucket::default());
        } else {
            for evicted in self.oldest_slot..new_oldest {
                let index = self.index_of(evicted);
                self.buckets[index] = Bucket::default();
            }
        }

        self.oldest_slot = new_oldest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_window_is_zero() {
        let mut window = RateStatsWindow::new(500, 1);
        assert_eq!(window.calculate(0), 0);
        assert_eq!(window.calculate(1_000), 0);

        window.update(1_000, 10);
        // A single bucket of history has no span to divide by
        assert_eq!(window.calculate(10), 0);
    }

    #[test]
    fn test_mean_rate_over_active_span() {
        let mut window = RateStatsWindow::new(500, 1);
        window.update(500, 0);
        window.update(500, 99);

        // 1000 bytes over 100 ms
        assert_eq!(window.calculate(99), 10_000);
        assert_eq!(window.accumulated_count(), 1_000);
        assert_eq!(window.sample_count(), 2);
    }

    #[test]
    fn test_full_window_rate() {
        let mut window = RateStatsWindow::new(500, 1);
        for t in 0..500 {
            window.update(100, t);
        }
        // 100 bytes per ms
        assert_eq!(window.calculate(499), 100_000);
    }

    #[test]
    fn test_burst_then_idle_decays_to_zero() {
        let mut window = RateStatsWindow::new(500, 1);
        for _ in 0..50 {
            window.update(1_500, 0);
        }
        window.update(1_500, 1);
        assert!(window.calculate(1) > 0);

        let mut previous = window.calculate(100);
        for now in (200..=600).step_by(100) {
            let rate = window.calculate(now);
            assert!(rate <= previous);
            previous = rate;
        }
        assert_eq!(window.calculate(501), 0);
        assert_eq!(window.calculate(10_000), 0);
        // Diagnostics total never decreases
        assert_eq!(window.accumulated_count(), 51 * 1_500);
    }

    #[test]
    fn test_skipped_buckets_are_cleared_before_reuse() {
        let mut window = RateStatsWindow::new(10, 1);
        for t in 0..10 {
            window.update(10, t);
        }
        assert_eq!(window.calculate(9), 10_000);

        // Jump 5 slots ahead: slots 0..=5 fall out of the window
        window.update(10, 15);
        // Remaining: slots 6..=9 (40 bytes) plus slot 15 (10 bytes) over 10 ms
        assert_eq!(window.calculate(15), 5_000);
        assert_eq!(window.samples_in_window(), 5);
    }

    #[test]
    fn test_samples_before_window_are_ignored() {
        let mut window = RateStatsWindow::new(10, 1);
        window.update(10, 100);
        window.update(10, 101);
        window.update(1_000_000, 50);

        assert_eq!(window.accumulated_count(), 20);
        assert_eq!(window.calculate(101), 10_000);
    }

    #[test]
    fn test_coarse_buckets() {
        let mut window = RateStatsWindow::new(10, 100);
        assert_eq!(window.horizon_ms(), 1_000);

        window.update(1_000, 0);
        window.update(1_000, 150);
        // Two 100 ms buckets span 200 ms
        assert_eq!(window.calculate(150), 10_000);
    }

    #[test]
    fn test_reset() {
        let mut window = RateStatsWindow::new(10, 1);
        window.update(10, 0);
        window.update(10, 5);
        window.reset();

        assert_eq!(window.calculate(5), 0);
        assert_eq!(window.accumulated_count(), 0);
    }
}
