//! Status and query commands.
//!
//! Handles retrieving the current state of the packet processing engine,
//! including running status, per-module switches and statistics.

use serde::Serialize;

use crate::commands::state::PacketProcessingState;
use crate::error::{Result, SnarlError};
use crate::network::modules::registry::MODULES;
use crate::network::modules::stats::rate_limit_stats::RateLimitStats;
use crate::network::processing::{StatusSnapshot, SwitchState};
use crate::settings::Settings;

/// Switch state of one module as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStatus {
    pub name: String,
    pub display_name: String,
    pub enabled: bool,
    /// The module reported pending work since the last status refresh
    pub active: bool,
}

/// Selected statistics, present while the engine runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStatisticsDto {
    pub lag_held: usize,
    pub dropped: usize,
    pub throttle_is_throttling: bool,
    pub throttle_dropped_count: usize,
    pub reorder_delayed_packets: usize,
    pub tampered_packets: usize,
    pub reset_packets: usize,
    pub bandwidth_buffered: usize,
    pub rate_limit: RateLimitStats,
}

/// Everything the status display needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStatus {
    pub running: bool,
    pub modules: Vec<ModuleStatus>,
    pub status: StatusSnapshot,
    pub status_line: String,
    pub statistics: Option<ProcessingStatisticsDto>,
}

/// Gets the current status of the processing engine.
pub fn get_status(state: &PacketProcessingState) -> Result<ProcessingStatus> {
    let running = state.is_running();

    let modules = MODULES
        .iter()
        .map(|entry| {
            let switch = state.switches.get(entry.kind);
            ModuleStatus {
                name: entry.name.to_string(),
                display_name: entry.display_name.to_string(),
                enabled: switch.is_on(),
                active: switch == SwitchState::Active,
            }
        })
        .collect();

    let status = state
        .status
        .lock()
        .map_err(|_| SnarlError::lock_poisoned("status monitor"))?
        .latest()
        .clone();

    let statistics = if running {
        let stats = state
            .statistics
            .read()
            .map_err(|_| SnarlError::lock_poisoned("statistics"))?;
        Some(ProcessingStatisticsDto {
            lag_held: stats.lag_stats.current_held(),
            dropped: stats.drop_stats.total_dropped,
            throttle_is_throttling: stats.throttle_stats.is_throttling(),
            throttle_dropped_count: stats.throttle_stats.dropped_count(),
            reorder_delayed_packets: stats.reorder_stats.delayed_packets(),
            tampered_packets: stats.tamper_stats.tampered_packets(),
            reset_packets: stats.reset_stats.reset_count(),
            bandwidth_buffered: stats.bandwidth_stats.buffered_packets(),
            rate_limit: stats.rate_limit_stats.clone(),
        })
    } else {
        None
    };

    Ok(ProcessingStatus {
        running,
        modules,
        status_line: status.status_line(),
        status,
        statistics,
    })
}

/// Gets the current module parameters.
pub fn get_settings(state: &PacketProcessingState) -> Result<Settings> {
    Ok(state.lock_settings()?.clone())
}
