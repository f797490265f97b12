//! Utility functions for packet processing.
//!
//! This module contains shared utility functions used throughout the application.

use log::info;
use std::time::Instant;

/// Logs packet statistics including received count, sent count, and drop percentage.
///
/// # Arguments
///
/// * `received` - Number of packets received
/// * `sent` - Number of packets sent
pub fn log_statistics(received: usize, sent: usize) {
    let dropped = received.saturating_sub(sent);
    let dropped_percentage = if received == 0 {
        0.0
    } else {
        (dropped as f64 / received as f64) * 100.0
    };

    info!(
        "Received Packets: {}, Sent Packets: {}, Skipped Packets: {} - {:.2}%",
        received, sent, dropped, dropped_percentage
    );
}

/// Monotonic millisecond clock shared by the engine threads.
///
/// Copies share the same origin, so timestamps taken on the capture thread
/// compare directly with tick times on the shaping thread.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the clock was created.
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
