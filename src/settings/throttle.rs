use crate::network::types::probability::Probability;
use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

/// Upper bound for a throttle cycle, in milliseconds.
pub const MAX_TIMEFRAME_MS: u64 = 1_000;

/// Maximum number of packets held during one throttle cycle.
pub const THROTTLE_BUFFER_LIMIT: usize = 1_000;

#[derive(Args, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ThrottleOptions {
    /// Whether to apply to inbound (download) traffic
    #[arg(long = "throttle-inbound", id = "throttle-inbound", default_value_t = true, action = ArgAction::Set)]
    pub inbound: bool,

    /// Whether to apply to outbound (upload) traffic
    #[arg(long = "throttle-outbound", id = "throttle-outbound", default_value_t = true, action = ArgAction::Set)]
    pub outbound: bool,

    /// Probability of starting a throttle cycle, ranging from 0.0 to 1.0
    #[arg(long = "throttle-probability", id = "throttle-probability", default_value_t = Probability::default())]
    pub probability: Probability,

    /// Duration in milliseconds of each throttle cycle (0-1000)
    #[arg(long = "throttle-timeframe", id = "throttle-timeframe", default_value_t = 30)]
    pub timeframe_ms: u64,

    /// Drop the packets held during a cycle instead of releasing them
    #[arg(long = "throttle-drop", id = "throttle-drop", default_value_t = false)]
    pub drop_throttled: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        ThrottleOptions {
            inbound: true,
            outbound: true,
            probability: Probability::default(),
            timeframe_ms: 30,
            drop_throttled: false,
        }
    }
}
