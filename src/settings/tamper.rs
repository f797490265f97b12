use crate::network::types::probability::Probability;
use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

fn default_amount() -> Probability {
    Probability::clamped(0.1)
}

#[derive(Args, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TamperOptions {
    /// Whether to apply to inbound (download) traffic
    #[arg(long = "tamper-inbound", id = "tamper-inbound", default_value_t = true, action = ArgAction::Set)]
    pub inbound: bool,

    /// Whether to apply to outbound (upload) traffic
    #[arg(long = "tamper-outbound", id = "tamper-outbound", default_value_t = true, action = ArgAction::Set)]
    pub outbound: bool,

    /// Probability of tampering packets, ranging from 0.0 to 1.0
    #[arg(long = "tamper-probability", id = "tamper-probability", default_value_t = Probability::default())]
    pub probability: Probability,

    /// Fraction of payload bytes to alter, ranging from 0.0 to 1.0
    #[arg(long = "tamper-amount", id = "tamper-amount", default_value_t = default_amount())]
    pub amount: Probability,

    /// Recompute IPv4/TCP/UDP checksums so tampered packets are not discarded by the receiver's stack
    #[arg(long = "tamper-redo-checksum", id = "tamper-redo-checksum", default_value_t = true, action = ArgAction::Set)]
    pub redo_checksum: bool,
}

impl Default for TamperOptions {
    fn default() -> Self {
        Self {
            inbound: true,
            outbound: true,
            probability: Probability::default(),
            amount: default_amount(),
            redo_checksum: true,
        }
    }
}
