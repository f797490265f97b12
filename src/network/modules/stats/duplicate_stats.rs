use crate::network::modules::stats::util::ewma::Ewma;

/// Statistics tracker for packet duplication
///
/// Counts packets rolled by the module against the packets that left it,
/// plus an EWMA of the per-packet multiplier.
#[derive(Debug)]
pub struct DuplicateStats {
    pub(crate) incoming_packet_count: usize,
    pub(crate) outgoing_packet_count: usize,
    ewma: Ewma,
}

impl DuplicateStats {
    /// Creates a new `DuplicateStats` with zeroed counters.
    ///
    /// # Arguments
    ///
    /// * `alpha` - The smoothing factor (0.0-1.0) for the multiplier EWMA
    ///
    /// # Example
    ///
    /// ```
    /// use snarl::network::modules::stats::duplicate_stats::DuplicateStats;
    ///
    /// let mut stats = DuplicateStats::new(0.5);
    /// assert_eq!(stats.total_duplication_multiplier(), 1.0);
    ///
    /// stats.record(3); // duplicated into three packets
    /// stats.record(1); // passed through once
    /// assert_eq!(stats.total_duplication_multiplier(), 2.0);
    /// ```
    pub fn new(alpha: f64) -> Self {
        Self {
            incoming_packet_count: 0,
            outgoing_packet_count: 0,
            ewma: Ewma::new(alpha),
        }
    }

    /// Records one incoming packet that left the module as `outgoing_count` copies
    /// (the original included).
    pub fn record(&mut self, outgoing_count: usize) {
        self.incoming_packet_count += 1;
        self.outgoing_packet_count += outgoing_count;
        self.ewma.update(outgoing_count as f64);
    }

    /// Ratio of outgoing to incoming packets, 1.0 before any traffic.
    pub fn total_duplication_multiplier(&self) -> f64 {
        if self.incoming_packet_count == 0 {
            1.0
        } else {
            self.outgoing_packet_count as f64 / self.incoming_packet_count as f64
        }
    }

    /// Smoothed recent multiplier, 1.0 before any traffic.
    pub fn recent_duplication_multiplier(&self) -> f64 {
        self.ewma.value_or(1.0)
    }
}
