//! Packet receiving module.
//!
//! The capture thread pulls packets from a [`PacketSource`] and appends them
//! to the shared queue of the [`PacketExchange`].

use crate::error::Result;
use crate::network::core::PacketData;
use crate::network::processing::exchange::{lock_exchange, SharedExchange};
use crate::utils::MonotonicClock;
use log::{debug, error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something that captures packets off the network.
///
/// `receive` may block for a short while, but it must come back regularly
/// so the capture thread can notice a stop request.
pub trait PacketSource: Send {
    /// Returns the packets captured since the last call. Arrival times are
    /// taken from `clock`.
    fn receive(&mut self, clock: &MonotonicClock) -> Result<Vec<PacketData>>;
}

/// Raises a flag when dropped.
///
/// The capture thread holds one for its whole life, so the shaping thread
/// learns that no more packets will arrive even if capture fails or panics.
pub struct CaptureFinished(Arc<AtomicBool>);

impl CaptureFinished {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        flag.store(false, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for CaptureFinished {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Receives packets until `running` is cleared.
///
/// Source errors are logged and the loop keeps going. Returns the number of
/// packets handed to the exchange.
///
/// # Arguments
///
/// * `source` - Where packets come from
/// * `exchange` - Shared queue the packets are appended to
/// * `running` - Atomic flag to control thread execution
/// * `clock` - Clock shared with the shaping thread
pub fn receive_packets<S: PacketSource>(
    mut source: S,
    exchange: SharedExchange,
    running: Arc<AtomicBool>,
    clock: MonotonicClock,
) -> Result<usize> {
    let mut received = 0;

    while running.load(Ordering::SeqCst) {
        let packets = match source.receive(&clock) {
            Ok(packets) => packets,
            Err(e) => {
                error!("Failed to receive packets: {}", e);
                continue;
            }
        };

        if packets.is_empty() {
            continue;
        }

        let mut exchange = lock_exchange(&exchange)?;
        for packet in packets {
            exchange.capture(packet);
            received += 1;
        }
    }

    debug!("Shutting down packet receiving thread after {} packets", received);
    Ok(received)
}
