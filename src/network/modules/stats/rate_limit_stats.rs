use serde::Serialize;

/// Externally observable state of the rate limiter.
///
/// Written by the shaping thread at the end of every tick and read by the
/// status refresh and the control surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateLimitStats {
    /// Windowed release throughput in bytes per second
    pub data_rate_bytes_per_sec: u64,

    /// Smoothed difference between actual and scheduled release times
    pub queue_delay_ms: f64,

    /// Packets held in the private buffer
    pub buffered: usize,

    /// Packets moved from the shared queue into the buffer
    pub admitted: usize,

    /// Packets released through the admission gate
    pub released: usize,

    /// Packets force-released by overflow flushes
    pub flushed: usize,
}

impl RateLimitStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data rate in the status display's Kbps unit (bytes per second / 128).
    pub fn data_rate_kbps(&self) -> u64 {
        self.data_rate_bytes_per_sec / 128
    }

    /// Queue delay rounded down to whole milliseconds, never negative.
    pub fn queue_delay_whole_ms(&self) -> u64 {
        if self.queue_delay_ms.is_finite() && self.queue_delay_ms > 0.0 {
            self.queue_delay_ms as u64
        } else {
            0
        }
    }
}
