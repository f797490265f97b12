//! # Snarl - a packet queue and shaping pipeline
//!
//! Snarl degrades network traffic on purpose so applications can be tested
//! against poor connections. Captured packets are held in one arena and
//! passed, once per tick, through a fixed chain of shaping modules.
//!
//! ## Features
//!
//! * Lag - Hold packets for a fixed time plus random variation
//! * Packet dropping - Randomly drop packets to simulate packet loss
//! * Network throttling - Hold traffic in bursts, then release or drop it
//! * Packet duplication - Send several copies of a packet
//! * Packet reordering - Change the order packets arrive in
//! * Packet tampering - Corrupt packet payloads
//! * Connection reset - Set RST on TCP segments
//! * Bandwidth limiting - Cap throughput at a static KB/s figure
//! * Rate limiting - Queue packets and release them under a Mbps cap with
//!   measured queueing delay
//!
//! ## Architecture
//!
//! * [`network::core`] - the packet arena and its queues
//! * [`network::modules`] - the shaping modules and their statistics
//! * [`network::processing`] - capture thread, shaping thread and the tick pipeline
//! * [`commands`] - start, stop, settings, status and text control commands
//! * [`settings`] - module parameters, loadable from the command line or TOML
//!
//! Capturing and reinjecting real traffic is left to a [`network::processing::PacketSource`]
//! and [`network::processing::PacketSink`]; a synthetic pair lives in
//! [`network::processing::loopback`].
//!
//! ## Quick Start
//!
//! ```rust
//! use snarl::prelude::*;
//!
//! let config = SettingsBuilder::new()
//!     .drop(25.0)      // 25% packet drop rate
//!     .lag(100)        // 100ms lag
//!     .rate_limit(8)   // 8 Mbps cap
//!     .into_config();
//!
//! let state = PacketProcessingState::new();
//! apply_config(&state, &config).unwrap();
//! assert_eq!(state.switches.enabled_kinds().len(), 3);
//! ```

/// Control commands operating on the shared engine state
pub mod commands;
/// Centralized error handling
pub mod error;
/// Packet queues, shaping modules and the engine
pub mod network;
/// Prelude for convenient imports
pub mod prelude;
/// Configuration settings for the shaping modules
pub mod settings;
/// Telemetry events reported by the control surface
pub mod telemetry;
/// Shared utility functions
pub mod utils;

// Re-export commonly used types
pub use error::{Result, SnarlError};
