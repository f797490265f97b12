//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types and traits from the crate,
//! allowing users to import everything they need with a single use statement:
//!
//! ```rust
//! use snarl::prelude::*;
//! ```

// Error handling
pub use crate::error::{Result, SnarlError};

// Network core
pub use crate::network::core::{Direction, PacketData, PacketHandle, PacketQueue, PacketStore};

// Module traits and registry
pub use crate::network::modules::registry::{ModuleKind, ShapingModule};
pub use crate::network::modules::traits::{ModuleContext, PacketModule};

// Statistics
pub use crate::network::modules::stats::PacketProcessingStatistics;

// Engine
pub use crate::network::processing::{
    ModuleSwitches, PacketExchange, PacketSink, PacketSource, Pipeline, SwitchState,
};

// Probability type
pub use crate::network::types::probability::Probability;

// Settings
pub use crate::settings::{ConfigFile, ProcessingOptions, Settings, SettingsBuilder};

// Individual module options (for advanced usage)
pub use crate::settings::{
    bandwidth::BandwidthOptions, drop::DropOptions, duplicate::DuplicateOptions,
    lag::LagOptions, rate_limit::RateLimitOptions, reorder::ReorderOptions, reset::ResetOptions,
    tamper::TamperOptions, throttle::ThrottleOptions,
};

// Commands
pub use crate::commands::{
    apply_config, start_processing, stop_processing, PacketProcessingState,
};

// Telemetry
pub use crate::telemetry::{LogTelemetry, NullTelemetry, Telemetry, TelemetryEvent};
