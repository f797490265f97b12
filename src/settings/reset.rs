use crate::network::types::probability::Probability;
use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

/// Options for the Reset module, which injects TCP RST flags.
#[derive(Args, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ResetOptions {
    /// Whether to apply to inbound (download) traffic
    #[arg(long = "reset-inbound", id = "reset-inbound", default_value_t = true, action = ArgAction::Set)]
    pub inbound: bool,

    /// Whether to apply to outbound (upload) traffic
    #[arg(long = "reset-outbound", id = "reset-outbound", default_value_t = true, action = ArgAction::Set)]
    pub outbound: bool,

    /// Probability of resetting a TCP segment, ranging from 0.0 to 1.0
    #[arg(long = "reset-probability", id = "reset-probability", default_value_t = Probability::default())]
    pub probability: Probability,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self {
            inbound: true,
            outbound: true,
            probability: Probability::default(),
        }
    }
}
