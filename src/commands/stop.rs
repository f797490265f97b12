//! Stop processing command.
//!
//! Handles the shutdown of the packet processing engine.

use std::sync::atomic::Ordering;

use log::info;

use crate::commands::state::PacketProcessingState;
use crate::error::{Result, SnarlError};
use crate::network::processing::ProcessingSummary;

/// Stops packet processing.
///
/// Signals the packet receiving and shaping threads to shut down and waits
/// for them. The shaping thread holds its final drain until capture has
/// exited, then closes every module, so neither a late capture batch nor
/// packets held by a module are lost. Also collects an
/// engine that already stopped on its own after a timeout.
///
/// # Arguments
///
/// * `state` - The application state containing shared resources
///
/// # Returns
///
/// * `Ok(ProcessingSummary)` - Totals of the finished run
/// * `Err(SnarlError::NotRunning)` - If no engine was started
pub fn stop_processing(state: &PacketProcessingState) -> Result<ProcessingSummary> {
    let threads = state.lock_threads()?.take();
    let Some(threads) = threads else {
        return Err(SnarlError::NotRunning);
    };

    state.running.store(false, Ordering::SeqCst);
    let summary = threads.join()?;

    state.report_switches();
    info!("Stopped packet processing and cleaned up resources");

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::start::start_processing;
    use crate::network::core::{Direction, PacketData};
    use crate::network::modules::registry::ModuleKind;
    use crate::network::processing::loopback::{CountingSink, LoopbackSource};
    use crate::network::processing::PacketSource;
    use crate::network::types::probability::Probability;
    use crate::telemetry::testing::RecordingTelemetry;
    use crate::telemetry::TelemetryEvent;
    use crate::utils::MonotonicClock;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_start_and_stop() {
        let telemetry = Arc::new(RecordingTelemetry::default());
        let state = PacketProcessingState::with_telemetry(telemetry.clone());
        state.lock_processing().unwrap().tick_interval_ms = 5;
        state.lock_settings().unwrap().reorder.probability = Probability::ALWAYS;
        state.switches.set_enabled(ModuleKind::Reorder, true);

        let sink = CountingSink::new();
        let counters = sink.counters();
        start_processing(&state, LoopbackSource::new(2_000, 64), sink, None).unwrap();
        assert!(state.is_running());
        assert!(matches!(
            start_processing(&state, LoopbackSource::new(1, 1), CountingSink::new(), None),
            Err(SnarlError::AlreadyRunning)
        ));

        thread::sleep(Duration::from_millis(100));
        let summary = stop_processing(&state).unwrap();

        assert!(!state.is_running());
        assert!(summary.received > 0);
        // Reorder never loses packets, even the ones held at shutdown
        assert_eq!(summary.sent, summary.received);
        assert_eq!(counters.packets(), summary.sent);

        let events = telemetry.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            TelemetryEvent::ModuleEnabled { running: true, modules } if modules.contains("ood 1")
        ));
        assert!(matches!(
            &events[1],
            TelemetryEvent::ModuleEnabled { running: false, .. }
        ));
    }

    #[test]
    fn test_stop_without_start() {
        let state = PacketProcessingState::new();
        assert!(matches!(stop_processing(&state), Err(SnarlError::NotRunning)));
    }

    #[test]
    fn test_timeout_stops_engine() {
        let state = PacketProcessingState::new();
        start_processing(
            &state,
            LoopbackSource::new(100, 16),
            CountingSink::new(),
            Some(Duration::from_millis(30)),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(300));
        assert!(!state.is_running());

        // Still collectable, and a fresh start works afterwards
        stop_processing(&state).unwrap();
        start_processing(&state, LoopbackSource::new(100, 16), CountingSink::new(), None).unwrap();
        stop_processing(&state).unwrap();
    }

    /// Sleeps inside every receive and counts what it hands out.
    struct BlockingSource {
        handed_out: Arc<AtomicUsize>,
    }

    impl PacketSource for BlockingSource {
        fn receive(&mut self, clock: &MonotonicClock) -> Result<Vec<PacketData>> {
            thread::sleep(Duration::from_millis(40));
            let batch: Vec<_> = (0..4)
                .map(|id| PacketData::new(vec![id; 48], Direction::Outbound, clock.now_ms()))
                .collect();
            self.handed_out.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(batch)
        }
    }

    #[test]
    fn test_stop_sends_batch_captured_while_stopping() {
        let state = PacketProcessingState::new();
        state.lock_processing().unwrap().tick_interval_ms = 1;
        let handed_out = Arc::new(AtomicUsize::new(0));

        let sink = CountingSink::new();
        let counters = sink.counters();
        let source = BlockingSource {
            handed_out: handed_out.clone(),
        };
        start_processing(&state, source, sink, None).unwrap();

        // Lands in the middle of a receive
        thread::sleep(Duration::from_millis(100));
        let summary = stop_processing(&state).unwrap();

        let handed_out = handed_out.load(Ordering::SeqCst);
        assert!(handed_out >= 8);
        assert_eq!(summary.received, handed_out);
        assert_eq!(summary.sent, handed_out);
        assert_eq!(counters.packets(), handed_out);
    }
}
