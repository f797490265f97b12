use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction in which a captured packet was travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Download traffic, arriving at this host
    Inbound,
    /// Upload traffic, leaving this host
    Outbound,
}

impl Direction {
    /// Returns true for outbound (upload) traffic.
    pub fn is_outbound(self) -> bool {
        matches!(self, Direction::Outbound)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}

/// Represents a network packet with metadata for processing.
///
/// The raw bytes are owned by the packet. Timing is expressed in monotonic
/// milliseconds supplied by the scheduler, never read from the wall clock,
/// so shaping decisions stay reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketData {
    /// The raw packet bytes, starting at the IP header
    pub data: Vec<u8>,

    /// Whether this packet is outbound (upload) or inbound (download)
    pub direction: Direction,

    /// Monotonic timestamp (ms) at which the packet was captured
    pub arrival_ms: u64,

    /// Monotonic timestamp (ms) before which a holding module keeps the packet
    pub send_deadline_ms: u64,
}

impl PacketData {
    /// Creates a `PacketData` captured at `arrival_ms`.
    ///
    /// The send deadline starts out equal to the arrival time, meaning
    /// "send as soon as possible".
    pub fn new(data: Vec<u8>, direction: Direction, arrival_ms: u64) -> Self {
        PacketData {
            data,
            direction,
            arrival_ms,
            send_deadline_ms: arrival_ms,
        }
    }

    /// Returns the size of the packet in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true for outbound (upload) packets
    pub fn is_outbound(&self) -> bool {
        self.direction.is_outbound()
    }

    /// Checks the packet against a module's inbound/outbound toggles.
    pub fn matches_direction(&self, apply_inbound: bool, apply_outbound: bool) -> bool {
        match self.direction {
            Direction::Outbound => apply_outbound,
            Direction::Inbound => apply_inbound,
        }
    }

    /// Returns the milliseconds elapsed since the packet was captured
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.arrival_ms)
    }
}
