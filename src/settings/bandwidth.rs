use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

/// Upper bound for the bandwidth limit in KB/s.
pub const MAX_LIMIT_KBPS: usize = 99_999;

#[derive(Args, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BandwidthOptions {
    /// Whether to apply to inbound (download) traffic
    #[arg(long = "bandwidth-inbound", id = "bandwidth-inbound", default_value_t = true, action = ArgAction::Set)]
    pub inbound: bool,

    /// Whether to apply to outbound (upload) traffic
    #[arg(long = "bandwidth-outbound", id = "bandwidth-outbound", default_value_t = true, action = ArgAction::Set)]
    pub outbound: bool,

    /// Maximum bandwidth in KB/s (0 disables the cap)
    #[arg(long = "bandwidth-limit", id = "bandwidth-limit", default_value_t = 0)]
    pub limit_kbps: usize,
}

impl Default for BandwidthOptions {
    fn default() -> Self {
        Self {
            inbound: true,
            outbound: true,
            limit_kbps: 0,
        }
    }
}
