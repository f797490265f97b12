use crate::network::modules::stats::util::ewma::Ewma;

/// Statistics tracker for packet reordering
///
/// Tracks packets seen, packets moved out of their arrival position and
/// packets held back across ticks, along with an EWMA of the reorder rate.
#[derive(Debug)]
pub struct ReorderStats {
    pub(crate) total_packets: usize,
    pub(crate) reordered_packets: usize,
    pub(crate) delayed_packets: usize,
    ewma: Ewma,
}

impl ReorderStats {
    /// Creates a new `ReorderStats` with zeroed counters.
    ///
    /// # Arguments
    ///
    /// * `alpha` - The smoothing factor (0.0-1.0) for the reorder rate EWMA
    ///
    /// # Returns
    ///
    /// A tracker that reports a recent reorder rate of 0.0 until the first
    /// packet is recorded.
    pub fn new(alpha: f64) -> Self {
        Self {
            total_packets: 0,
            reordered_packets: 0,
            delayed_packets: 0,
            ewma: Ewma::new(alpha),
        }
    }

    /// Records whether one packet ended up out of its arrival position.
    pub fn record(&mut self, reordered: bool) {
        self.total_packets += 1;
        if reordered {
            self.reordered_packets += 1;
        }
        self.ewma.update(if reordered { 1.0 } else { 0.0 });
    }

    /// Records a packet held back to be released behind later arrivals.
    pub fn record_delayed(&mut self) {
        self.delayed_packets += 1;
    }

    pub fn recent_reorder_rate(&self) -> f64 {
        self.ewma.value_or(0.0)
    }

    pub fn delayed_packets(&self) -> usize {
        self.delayed_packets
    }
}
