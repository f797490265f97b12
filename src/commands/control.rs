//! Remote text control commands.
//!
//! A control client sends one line such as `LagDelayMs 120` and always gets
//! the rate limiter status back, `DataRateKbps <n>   QueueDelayMs <n>`, taken
//! before the command is applied. The transport carrying the lines is up to
//! the caller.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};

use crate::commands::state::PacketProcessingState;
use crate::commands::update::modify_settings;
use crate::error::{Result, SnarlError};
use crate::network::types::probability::Probability;

/// A parsed control line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Sets the lag time in milliseconds
    LagDelayMs(u64),
    /// Sets the drop chance in percent
    DropChancePct(f64),
    /// Sets the static bandwidth limit in KB/s
    BandwidthLimitKBps(usize),
    /// Sets the rate limiter cap in Mbps
    RateLimitMbps(u32),
}

impl FromStr for ControlCommand {
    type Err = SnarlError;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(SnarlError::InvalidCommand(line.to_string()));
        };
        let invalid = || SnarlError::InvalidCommand(line.to_string());

        match name {
            "LagDelayMs" => value.parse().map(ControlCommand::LagDelayMs).map_err(|_| invalid()),
            "DropChancePct" => value
                .parse()
                .map(ControlCommand::DropChancePct)
                .map_err(|_| invalid()),
            "BandwidthLimitKBps" => value
                .parse()
                .map(ControlCommand::BandwidthLimitKBps)
                .map_err(|_| invalid()),
            "RateLimitMbps" => value
                .parse()
                .map(ControlCommand::RateLimitMbps)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::LagDelayMs(value) => write!(f, "LagDelayMs {}", value),
            ControlCommand::DropChancePct(value) => write!(f, "DropChancePct {}", value),
            ControlCommand::BandwidthLimitKBps(value) => write!(f, "BandwidthLimitKBps {}", value),
            ControlCommand::RateLimitMbps(value) => write!(f, "RateLimitMbps {}", value),
        }
    }
}

/// Outcome of one control line.
#[derive(Debug)]
pub struct ControlResponse {
    /// Status reply sent back to the client
    pub reply: String,
    /// The command that was applied, or why nothing was
    pub outcome: Result<ControlCommand>,
}

/// Applies a parsed command to the settings.
pub fn apply_control_command(state: &PacketProcessingState, command: ControlCommand) -> Result<()> {
    modify_settings(state, |settings| match command {
        ControlCommand::LagDelayMs(time_ms) => settings.lag.time_ms = time_ms,
        ControlCommand::DropChancePct(chance) => {
            settings.drop.probability = Probability::from_percent(chance)
        }
        ControlCommand::BandwidthLimitKBps(limit) => settings.bandwidth.limit_kbps = limit,
        ControlCommand::RateLimitMbps(mbps) => settings.rate_limit.data_rate_mbps = mbps,
    })
}

/// Renders the rate limiter's current status as a reply line.
pub fn status_reply(state: &PacketProcessingState) -> Result<String> {
    let stats = state
        .statistics
        .read()
        .map_err(|_| SnarlError::lock_poisoned("statistics"))?;
    let rate_limit = &stats.rate_limit_stats;
    Ok(format!(
        "DataRateKbps {}   QueueDelayMs {}",
        rate_limit.data_rate_kbps(),
        rate_limit.queue_delay_whole_ms()
    ))
}

/// Handles one control line.
///
/// The reply is produced even when the line does not parse or the value is
/// rejected.
pub fn handle_control_line(state: &PacketProcessingState, line: &str) -> ControlResponse {
    let reply = status_reply(state).unwrap_or_else(|e| {
        warn!("Failed to build status reply: {}", e);
        "DataRateKbps 0   QueueDelayMs 0".to_string()
    });

    let outcome = line
        .trim()
        .parse::<ControlCommand>()
        .and_then(|command| apply_control_command(state, command).map(|()| command));

    match &outcome {
        Ok(command) => debug!("Control command applied: {}", command),
        Err(e) => warn!("Control command rejected: {}", e),
    }

    ControlResponse { reply, outcome }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::modules::stats::rate_limit_stats::RateLimitStats;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "LagDelayMs 120".parse::<ControlCommand>().unwrap(),
            ControlCommand::LagDelayMs(120)
        );
        assert_eq!(
            "DropChancePct 2.5".parse::<ControlCommand>().unwrap(),
            ControlCommand::DropChancePct(2.5)
        );
        assert_eq!(
            "BandwidthLimitKBps  64".parse::<ControlCommand>().unwrap(),
            ControlCommand::BandwidthLimitKBps(64)
        );
        assert_eq!(
            "RateLimitMbps 8".parse::<ControlCommand>().unwrap(),
            ControlCommand::RateLimitMbps(8)
        );
        assert_eq!(ControlCommand::RateLimitMbps(8).to_string(), "RateLimitMbps 8");

        for line in ["", "LagDelayMs", "LagDelayMs ten", "LagDelayMs -5", "Jitter 5", "LagDelayMs 1 2"] {
            assert!(
                matches!(line.parse::<ControlCommand>(), Err(SnarlError::InvalidCommand(_))),
                "{:?} parsed",
                line
            );
        }
    }

    #[test]
    fn test_reply_reflects_rate_limiter() {
        let state = PacketProcessingState::new();
        state.statistics.write().unwrap().rate_limit_stats = RateLimitStats {
            data_rate_bytes_per_sec: 131_072,
            queue_delay_ms: 42.9,
            ..RateLimitStats::default()
        };

        let response = handle_control_line(&state, "RateLimitMbps 16");

        assert_eq!(response.reply, "DataRateKbps 1024   QueueDelayMs 42");
        assert_eq!(response.outcome.unwrap(), ControlCommand::RateLimitMbps(16));
        assert_eq!(state.lock_settings().unwrap().rate_limit.data_rate_mbps, 16);
    }

    #[test]
    fn test_unknown_command_still_replies() {
        let state = PacketProcessingState::new();

        let response = handle_control_line(&state, "Hello there");

        assert_eq!(response.reply, "DataRateKbps 0   QueueDelayMs 0");
        assert!(matches!(response.outcome, Err(SnarlError::InvalidCommand(_))));
    }

    #[test]
    fn test_out_of_range_value_is_rejected() {
        let state = PacketProcessingState::new();

        let response = handle_control_line(&state, "LagDelayMs 99999");

        assert!(matches!(response.outcome, Err(SnarlError::Config(_))));
        assert_eq!(state.lock_settings().unwrap().lag.time_ms, 0);

        handle_control_line(&state, "DropChancePct 25").outcome.unwrap();
        assert_eq!(state.lock_settings().unwrap().drop.probability.value(), 0.25);
    }
}
