//! Core packet types: the packet record and the arena-backed queues that
//! hold packets while they are being shaped.

pub mod packet_data;
pub mod queue;

pub use packet_data::{Direction, PacketData};
pub use queue::{PacketHandle, PacketQueue, PacketStore};
