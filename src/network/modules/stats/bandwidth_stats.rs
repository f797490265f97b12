use crate::network::modules::stats::util::ewma::Ewma;

/// Interval over which sent bytes are folded into the throughput average.
const UPDATE_INTERVAL_MS: u64 = 100;

/// Statistics for the static bandwidth cap.
///
/// Buffer occupancy is overwritten every tick; byte totals only grow. The
/// throughput average is fed once per `UPDATE_INTERVAL_MS`, so short bursts
/// are averaged over the interval rather than reported tick by tick.
#[derive(Debug)]
pub struct BandwidthStats {
    /// Packets currently waiting in the module's buffer
    pub(crate) storage_packet_count: usize,

    /// Bytes currently waiting in the module's buffer
    pub(crate) storage_byte_count: usize,

    /// Total bytes released by the module
    pub(crate) total_byte_count: usize,

    /// Packets destroyed because the buffer exceeded its byte bound
    pub(crate) overflow_dropped: usize,

    ewma: Ewma,
    recent_byte_sent: usize,
    recent_start_ms: Option<u64>,
}

impl BandwidthStats {
    /// Creates a new `BandwidthStats` with an empty buffer and no traffic.
    ///
    /// # Arguments
    ///
    /// * `alpha` - The smoothing factor (0.0-1.0) for the KB/s average
    ///
    /// # Example
    ///
    /// ```
    /// use snarl::network::modules::stats::bandwidth_stats::BandwidthStats;
    ///
    /// let mut stats = BandwidthStats::new(0.5);
    /// stats.record(2_048, 0);
    /// stats.record(2_048, 100);
    /// assert_eq!(stats.total_bytes(), 4_096);
    /// assert!(stats.recent_throughput_kbps() > 0.0);
    /// ```
    pub fn new(alpha: f64) -> Self {
        BandwidthStats {
            storage_packet_count: 0,
            storage_byte_count: 0,
            total_byte_count: 0,
            overflow_dropped: 0,
            ewma: Ewma::new(alpha),
            recent_byte_sent: 0,
            recent_start_ms: None,
        }
    }

    /// Records `bytes_sent` released at `now_ms`.
    ///
    /// Every `UPDATE_INTERVAL_MS` the bytes sent in the interval are folded into
    /// the KB/s average.
    ///
    /// # Arguments
    ///
    /// * `bytes_sent` - Bytes released this tick
    /// * `now_ms` - Monotonic time of the tick
    pub fn record(&mut self, bytes_sent: usize, now_ms: u64) {
        self.total_byte_count += bytes_sent;
        self.recent_byte_sent += bytes_sent;

        let start = *self.recent_start_ms.get_or_insert(now_ms);
        let elapsed = now_ms.saturating_sub(start);
        if elapsed >= UPDATE_INTERVAL_MS {
            let seconds = elapsed as f64 / 1000.0;
            self.ewma.update((self.recent_byte_sent as f64 / 1024.0) / seconds);
            self.recent_byte_sent = 0;
            self.recent_start_ms = Some(now_ms);
        }
    }

    /// Updates the buffer occupancy figures.
    pub fn set_buffered(&mut self, packets: usize, bytes: usize) {
        self.storage_packet_count = packets;
        self.storage_byte_count = bytes;
    }

    pub fn total_bytes(&self) -> usize {
        self.total_byte_count
    }

    pub fn buffered_packets(&self) -> usize {
        self.storage_packet_count
    }

    pub fn buffered_bytes(&self) -> usize {
        self.storage_byte_count
    }

    pub fn overflow_dropped(&self) -> usize {
        self.overflow_dropped
    }

    /// Smoothed release throughput in KB/s.
    pub fn recent_throughput_kbps(&self) -> f64 {
        self.ewma.value_or(0.0)
    }
}
