use crate::network::types::probability::Probability;
use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

#[derive(Args, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReorderOptions {
    /// Whether to apply to inbound (download) traffic
    #[arg(long = "reorder-inbound", id = "reorder-inbound", default_value_t = true, action = ArgAction::Set)]
    pub inbound: bool,

    /// Whether to apply to outbound (upload) traffic
    #[arg(long = "reorder-outbound", id = "reorder-outbound", default_value_t = true, action = ArgAction::Set)]
    pub outbound: bool,

    /// Probability of reordering a tick's packets, ranging from 0.0 to 1.0
    #[arg(long = "reorder-probability", id = "reorder-probability", default_value_t = Probability::default())]
    pub probability: Probability,
}

impl Default for ReorderOptions {
    fn default() -> Self {
        Self {
            inbound: true,
            outbound: true,
            probability: Probability::default(),
        }
    }
}
