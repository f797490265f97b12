//! Settings and switch update commands.

use log::info;

use crate::commands::state::PacketProcessingState;
use crate::error::Result;
use crate::network::modules::registry::ModuleKind;
use crate::settings::lag::LagOptions;
use crate::settings::rate_limit::RateLimitOptions;
use crate::settings::{ConfigFile, Settings};
use crate::telemetry::TelemetryEvent;

/// Replaces the module parameters.
///
/// The new settings are validated first and left unapplied if any value is
/// out of range. Lag and rate limiter changes are reported to telemetry.
pub fn update_settings(state: &PacketProcessingState, settings: Settings) -> Result<()> {
    settings.validate()?;
    let previous = {
        let mut current = state.lock_settings()?;
        std::mem::replace(&mut *current, settings.clone())
    };

    report_changes(state, &previous, &settings);
    info!("Settings updated successfully");
    Ok(())
}

/// Applies `edit` to a copy of the current settings and stores the result.
pub fn modify_settings<F>(state: &PacketProcessingState, edit: F) -> Result<()>
where
    F: FnOnce(&mut Settings),
{
    let mut settings = state.lock_settings()?.clone();
    edit(&mut settings);
    update_settings(state, settings)
}

/// Arms or disarms one module.
///
/// Returns whether the switch changed. Telemetry hears about actual changes
/// only. A disarmed module hands its held packets back on the next tick.
pub fn set_module_enabled(
    state: &PacketProcessingState,
    kind: ModuleKind,
    enabled: bool,
) -> Result<bool> {
    let changed = state.switches.set_enabled(kind, enabled);
    if changed {
        info!(
            "{} {}",
            kind.display_name(),
            if enabled { "enabled" } else { "disabled" }
        );
        state.report_switches();
    }
    Ok(changed)
}

/// Applies a whole configuration: parameters, timing and the armed set.
pub fn apply_config(state: &PacketProcessingState, config: &ConfigFile) -> Result<()> {
    update_settings(state, config.settings.clone())?;
    *state.lock_processing()? = config.processing.clone();

    let mut changed = false;
    for kind in ModuleKind::ALL {
        changed |= state
            .switches
            .set_enabled(kind, config.enabled.contains(&kind));
    }
    if changed {
        state.report_switches();
    }
    Ok(())
}

fn report_changes(state: &PacketProcessingState, previous: &Settings, current: &Settings) {
    if previous.lag != current.lag {
        state.telemetry.record(lag_event(&current.lag));
    }
    if previous.rate_limit != current.rate_limit {
        state.telemetry.record(rate_limit_event(&current.rate_limit));
    }
}

fn lag_event(options: &LagOptions) -> TelemetryEvent {
    TelemetryEvent::LagSettings {
        inbound: options.inbound,
        outbound: options.outbound,
        time_ms: options.time_ms,
        variation_ms: options.variation_ms,
    }
}

fn rate_limit_event(options: &RateLimitOptions) -> TelemetryEvent {
    TelemetryEvent::RateLimitSettings {
        inbound: options.inbound,
        outbound: options.outbound,
        delay_ms: options.delay_ms,
        variation_ms: options.variation_ms,
        data_rate_mbps: options.data_rate_mbps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnarlError;
    use crate::settings::SettingsBuilder;
    use crate::telemetry::testing::RecordingTelemetry;
    use std::sync::Arc;

    fn state() -> (PacketProcessingState, Arc<RecordingTelemetry>) {
        let telemetry = Arc::new(RecordingTelemetry::default());
        (
            PacketProcessingState::with_telemetry(telemetry.clone()),
            telemetry,
        )
    }

    #[test]
    fn test_update_reports_lag_and_rate_changes() {
        let (state, telemetry) = state();

        update_settings(&state, SettingsBuilder::new().drop(10.0).build()).unwrap();
        assert!(telemetry.events().is_empty());

        modify_settings(&state, |s| {
            s.lag.time_ms = 250;
            s.rate_limit.data_rate_mbps = 4;
        })
        .unwrap();

        assert_eq!(
            telemetry.events(),
            vec![
                TelemetryEvent::LagSettings {
                    inbound: true,
                    outbound: true,
                    time_ms: 250,
                    variation_ms: 0,
                },
                TelemetryEvent::RateLimitSettings {
                    inbound: true,
                    outbound: true,
                    delay_ms: 0,
                    variation_ms: 0,
                    data_rate_mbps: 4,
                },
            ]
        );
        assert_eq!(state.lock_settings().unwrap().drop.probability.as_percent(), 10.0);
    }

    #[test]
    fn test_invalid_settings_are_not_applied() {
        let (state, telemetry) = state();

        let result = modify_settings(&state, |s| s.lag.time_ms = 60_000);

        assert!(matches!(result, Err(SnarlError::Config(_))));
        assert_eq!(state.lock_settings().unwrap().lag.time_ms, 0);
        assert!(telemetry.events().is_empty());
    }

    #[test]
    fn test_switch_changes_are_reported_once() {
        let (state, telemetry) = state();

        assert!(set_module_enabled(&state, ModuleKind::Lag, true).unwrap());
        assert!(!set_module_enabled(&state, ModuleKind::Lag, true).unwrap());
        assert!(set_module_enabled(&state, ModuleKind::Lag, false).unwrap());

        let events = telemetry.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            TelemetryEvent::ModuleEnabled { modules, .. } if modules.starts_with("lag 1,")
        ));
    }

    #[test]
    fn test_apply_config() {
        let (state, _) = state();
        state.switches.set_enabled(ModuleKind::Tamper, true);

        let config = SettingsBuilder::new()
            .lag(80)
            .rate_limit(2)
            .tick_interval(10)
            .into_config();
        apply_config(&state, &config).unwrap();

        assert_eq!(
            state.switches.enabled_kinds(),
            vec![ModuleKind::Lag, ModuleKind::RateLimit]
        );
        assert_eq!(state.lock_processing().unwrap().tick_interval_ms, 10);
        assert_eq!(state.lock_settings().unwrap().lag.time_ms, 80);
    }
}
