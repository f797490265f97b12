//! Settings for the shaping modules and the scheduler.
//!
//! Every module has an options struct that can be filled from the command
//! line (`clap`) or a TOML file (`serde`). [`Settings`] aggregates them and
//! [`ConfigFile`] adds the list of armed modules and scheduler timing.
//!
//! # Example
//!
//! ```rust
//! use snarl::settings::builder::SettingsBuilder;
//!
//! let settings = SettingsBuilder::new()
//!     .drop(50.0)
//!     .lag(100)
//!     .build();
//! assert_eq!(settings.lag.time_ms, 100);
//! ```

pub mod bandwidth;
pub mod builder;
pub mod config_file;
pub mod drop;
pub mod duplicate;
pub mod lag;
pub mod manipulation;
pub mod processing;
pub mod rate_limit;
pub mod reorder;
pub mod reset;
pub mod tamper;
pub mod throttle;

pub use builder::SettingsBuilder;
pub use config_file::ConfigFile;
pub use manipulation::Settings;
pub use processing::ProcessingOptions;
