use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

/// Upper bound for lag time and variation, in milliseconds.
pub const MAX_LAG_MS: u64 = 15_000;

/// Options for the Lag module.
///
/// Every matching packet is held for `time_ms`, shifted by a uniformly drawn
/// offset in `[-variation_ms, +variation_ms]`.
#[derive(Args, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LagOptions {
    /// Whether to apply to inbound (download) traffic
    #[arg(long = "lag-inbound", id = "lag-inbound", default_value_t = true, action = ArgAction::Set)]
    pub inbound: bool,

    /// Whether to apply to outbound (upload) traffic
    #[arg(long = "lag-outbound", id = "lag-outbound", default_value_t = true, action = ArgAction::Set)]
    pub outbound: bool,

    /// Lag time in milliseconds (0-15000)
    #[arg(long = "lag-time", id = "lag-time", default_value_t = 0)]
    pub time_ms: u64,

    /// Random variation around the lag time in milliseconds (0-15000)
    #[arg(long = "lag-variation", id = "lag-variation", default_value_t = 0)]
    pub variation_ms: u64,
}

impl Default for LagOptions {
    fn default() -> Self {
        Self {
            inbound: true,
            outbound: true,
            time_ms: 0,
            variation_ms: 0,
        }
    }
}
