//! Telemetry events emitted by the control surface.
//!
//! The engine reports module switches and parameter changes to a
//! [`Telemetry`] collaborator and never reads anything back from it.

use log::{info, warn};
use serde::Serialize;

/// Something worth reporting about the engine's configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Sent on start, stop and every switch change.
    ModuleEnabled {
        running: bool,
        /// `"lag 1, drop 0, ..."`
        modules: String,
    },
    LagSettings {
        inbound: bool,
        outbound: bool,
        time_ms: u64,
        variation_ms: u64,
    },
    RateLimitSettings {
        inbound: bool,
        outbound: bool,
        delay_ms: u64,
        variation_ms: u64,
        data_rate_mbps: u32,
    },
}

/// Receives telemetry events.
pub trait Telemetry: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Writes every event as JSON to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn record(&self, event: TelemetryEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "snarl::telemetry", "{}", json),
            Err(e) => warn!(target: "snarl::telemetry", "Failed to encode {:?}: {}", event, e),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn record(&self, _event: TelemetryEvent) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every event for inspection.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingTelemetry {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingTelemetry {
        pub(crate) fn events(&self) -> Vec<TelemetryEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Telemetry for RecordingTelemetry {
        fn record(&self, event: TelemetryEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_tagged() {
        let event = TelemetryEvent::ModuleEnabled {
            running: true,
            modules: "lag 1, drop 0".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"module_enabled","running":true,"modules":"lag 1, drop 0"}"#
        );

        let event = TelemetryEvent::RateLimitSettings {
            inbound: true,
            outbound: false,
            delay_ms: 20,
            variation_ms: 5,
            data_rate_mbps: 8,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "rate_limit_settings");
        assert_eq!(json["data_rate_mbps"], 8);
    }

    #[test]
    fn test_sinks_accept_events() {
        let event = TelemetryEvent::LagSettings {
            inbound: true,
            outbound: true,
            time_ms: 100,
            variation_ms: 0,
        };
        LogTelemetry.record(event.clone());
        NullTelemetry.record(event);
    }
}
