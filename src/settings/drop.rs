use crate::network::types::probability::Probability;
use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

/// Options for the Drop module.
#[derive(Args, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DropOptions {
    /// Whether to apply to inbound (download) traffic
    #[arg(long = "drop-inbound", id = "drop-inbound", default_value_t = true, action = ArgAction::Set)]
    pub inbound: bool,

    /// Whether to apply to outbound (upload) traffic
    #[arg(long = "drop-outbound", id = "drop-outbound", default_value_t = true, action = ArgAction::Set)]
    pub outbound: bool,

    /// Probability of dropping packets, ranging from 0.0 to 1.0
    #[arg(long = "drop-probability", id = "drop-probability", default_value_t = Probability::default())]
    pub probability: Probability,
}

impl Default for DropOptions {
    fn default() -> Self {
        Self {
            inbound: true,
            outbound: true,
            probability: Probability::default(),
        }
    }
}
