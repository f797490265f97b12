//! The engine: capture thread, shaping thread and what they share.

pub mod exchange;
pub mod loopback;
pub mod module_state;
pub mod pipeline;
pub mod processor;
pub mod receiver;
pub mod status;

pub use exchange::{PacketExchange, SharedExchange};
pub use module_state::{ModuleSwitches, SwitchState};
pub use pipeline::Pipeline;
pub use processor::{start_packet_processing, PacketSink, ProcessingHandles, ProcessingSummary};
pub use receiver::{receive_packets, CaptureFinished, PacketSource};
pub use status::{StatusMonitor, StatusSnapshot};
