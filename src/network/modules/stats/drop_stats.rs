use crate::network::modules::stats::util::ewma::Ewma;

/// Statistics for tracking packet dropping behavior.
///
/// Keeps aggregate counters plus an EWMA of the recent drop decisions
/// (1.0 for a drop, 0.0 for a pass).
///
/// # Fields
///
/// * `total_packets` - Packets that matched the direction filter and were rolled
/// * `total_dropped` - Packets destroyed by the module
/// * `ewma` - Smoothed recent drop rate
#[derive(Debug)]
pub struct DropStats {
    /// Packets that matched the direction filter and were rolled
    pub total_packets: usize,

    /// Packets destroyed by the module
    pub total_dropped: usize,

    ewma: Ewma,
}

impl DropStats {
    /// Creates a new `DropStats` with zeroed counters.
    ///
    /// # Arguments
    ///
    /// * `alpha` - The smoothing factor (0.0-1.0) for the EWMA. Higher values
    ///   give more weight to recent drop decisions.
    ///
    /// # Example
    ///
    /// ```
    /// use snarl::network::modules::stats::drop_stats::DropStats;
    ///
    /// let stats = DropStats::new(0.3);
    /// assert_eq!(stats.total_packets, 0);
    /// assert_eq!(stats.recent_drop_rate(), 0.0);
    /// ```
    pub fn new(alpha: f64) -> Self {
        Self {
            total_packets: 0,
            total_dropped: 0,
            ewma: Ewma::new(alpha),
        }
    }

    /// Records the outcome of one drop roll.
    ///
    /// # Arguments
    ///
    /// * `dropped` - Whether the packet was destroyed
    ///
    /// # Example
    ///
    /// ```
    /// use snarl::network::modules::stats::drop_stats::DropStats;
    ///
    /// let mut stats = DropStats::new(0.3);
    /// stats.record(true);
    /// stats.record(false);
    /// assert_eq!(stats.total_dropped, 1);
    /// assert_eq!(stats.total_drop_rate(), 0.5);
    /// ```
    pub fn record(&mut self, dropped: bool) {
        self.total_packets += 1;
        if dropped {
            self.total_dropped += 1;
        }
        self.ewma.update(if dropped { 1.0 } else { 0.0 });
    }

    /// Fraction of rolled packets dropped since tracking began.
    pub fn total_drop_rate(&self) -> f64 {
        if self.total_packets == 0 {
            return 0.0;
        }

        self.total_dropped as f64 / self.total_packets as f64
    }

    /// Smoothed recent drop rate, 0.0 before the first packet.
    pub fn recent_drop_rate(&self) -> f64 {
        self.ewma.value_or(0.0)
    }

    pub fn reset(&mut self) {
        self.total_packets = 0;
        self.total_dropped = 0;
        self.ewma.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_drop_stats() {
        let stats = DropStats::new(0.5);
        assert_eq!(stats.total_packets, 0);
        assert_eq!(stats.total_drop_rate(), 0.0);
        assert_eq!(stats.recent_drop_rate(), 0.0);
    }

    #[test]
    fn test_record_drops() {
        let mut stats = DropStats::new(0.5);
        stats.record(true);
        stats.record(false);
        stats.record(false);

        assert_eq!(stats.total_packets, 3);
        assert_eq!(stats.total_dropped, 1);
        assert_eq!(stats.total_drop_rate(), 1.0 / 3.0);
        assert_eq!(stats.recent_drop_rate(), 0.25);
    }

    #[test]
    fn test_reset() {
        let mut stats = DropStats::new(0.5);
        stats.record(true);
        stats.reset();

        assert_eq!(stats.total_dropped, 0);
        assert_eq!(stats.recent_drop_rate(), 0.0);
    }
}
