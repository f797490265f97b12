use crate::network::types::probability::Probability;
use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

/// Smallest meaningful copy count (the original plus one copy).
pub const MIN_DUPLICATE_COUNT: usize = 2;

/// Largest copy count accepted.
pub const MAX_DUPLICATE_COUNT: usize = 50;

#[derive(Args, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DuplicateOptions {
    /// Whether to apply to inbound (download) traffic
    #[arg(long = "duplicate-inbound", id = "duplicate-inbound", default_value_t = true, action = ArgAction::Set)]
    pub inbound: bool,

    /// Whether to apply to outbound (upload) traffic
    #[arg(long = "duplicate-outbound", id = "duplicate-outbound", default_value_t = true, action = ArgAction::Set)]
    pub outbound: bool,

    /// Probability of duplicating packets, ranging from 0.0 to 1.0
    #[arg(long = "duplicate-probability", id = "duplicate-probability", default_value_t = Probability::default())]
    pub probability: Probability,

    /// Total number of packets sent for a duplicated one, original included (2-50)
    #[arg(long = "duplicate-count", id = "duplicate-count", default_value_t = MIN_DUPLICATE_COUNT)]
    pub count: usize,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        Self {
            inbound: true,
            outbound: true,
            probability: Probability::default(),
            count: MIN_DUPLICATE_COUNT,
        }
    }
}
