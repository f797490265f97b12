//! Control commands.
//!
//! This module contains every operation a front end performs on the engine,
//! organized into submodules by functionality. Each takes the shared
//! [`PacketProcessingState`].

pub mod config;
pub mod control;
pub mod start;
pub mod state;
pub mod status;
pub mod stop;
pub mod update;

pub use state::PacketProcessingState;

pub use config::{delete_config, list_configs, load_config, save_config};
pub use control::{handle_control_line, ControlCommand, ControlResponse};
pub use start::start_processing;
pub use status::{get_settings, get_status, ProcessingStatus};
pub use stop::stop_processing;
pub use update::{apply_config, modify_settings, set_module_enabled, update_settings};
