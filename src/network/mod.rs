//! Packet shaping core.
//!
//! Captured packets live in one arena ([`core::PacketStore`]) and move
//! between queues without being copied. The shaping modules in [`modules`]
//! work on those queues once per tick, driven by [`processing`].

pub mod core;
pub mod modules;
pub mod processing;
pub mod types;
pub mod utils;
