//! Application state management for packet processing.
//!
//! This module contains the shared state the control commands work on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread::JoinHandle;

use log::{error, warn};

use crate::error::{Result, SnarlError};
use crate::network::modules::stats::PacketProcessingStatistics;
use crate::network::processing::{
    ModuleSwitches, ProcessingHandles, ProcessingSummary, SharedExchange, StatusMonitor,
};
use crate::settings::{ProcessingOptions, Settings};
use crate::telemetry::{LogTelemetry, Telemetry, TelemetryEvent};
use crate::utils::MonotonicClock;

/// Global state for the packet processing system.
///
/// Holds everything shared between the control commands and the engine
/// threads: settings, module switches, statistics and the running flag.
pub struct PacketProcessingState {
    /// Flag indicating whether packet processing is currently active
    pub running: Arc<AtomicBool>,
    /// Current module parameters
    pub settings: Arc<Mutex<Settings>>,
    /// Which modules are armed
    pub switches: Arc<ModuleSwitches>,
    /// Statistics collected during packet processing
    pub statistics: Arc<RwLock<PacketProcessingStatistics>>,
    /// Smoothed status for display
    pub status: Arc<Mutex<StatusMonitor>>,
    /// Scheduler timing used by the next start
    pub processing: Mutex<ProcessingOptions>,
    /// Receives switch and parameter change events
    pub telemetry: Arc<dyn Telemetry>,
    pub(crate) threads: Mutex<Option<EngineThreads>>,
}

/// Join handles of a running engine.
pub(crate) struct EngineThreads {
    pub(crate) receiver: JoinHandle<Result<usize>>,
    pub(crate) processor: JoinHandle<Result<ProcessingSummary>>,
}

impl EngineThreads {
    /// Waits for both threads, capture first. A capture failure is logged;
    /// the shaping thread's result is returned.
    pub(crate) fn join(self) -> Result<ProcessingSummary> {
        let captured = match self.receiver.join() {
            Ok(Ok(captured)) => Some(captured),
            Ok(Err(e)) => {
                error!("Packet receiving error: {}", e);
                None
            }
            Err(_) => {
                error!("Packet receiving thread panicked");
                None
            }
        };

        let summary = self
            .processor
            .join()
            .map_err(|_| SnarlError::ThreadPanicked("packet processing"))??;

        if let Some(captured) = captured {
            if captured != summary.received {
                warn!(
                    "Capture thread handed over {} packets but shaping saw {}",
                    captured, summary.received
                );
            }
        }

        Ok(summary)
    }
}

impl Default for PacketProcessingState {
    fn default() -> Self {
        Self::with_telemetry(Arc::new(LogTelemetry))
    }
}

impl PacketProcessingState {
    /// Creates a new PacketProcessingState with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_telemetry(telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            settings: Arc::new(Mutex::new(Settings::default())),
            switches: Arc::new(ModuleSwitches::new()),
            statistics: Arc::new(RwLock::new(PacketProcessingStatistics::default())),
            status: Arc::new(Mutex::new(StatusMonitor::new())),
            processing: Mutex::new(ProcessingOptions::default()),
            telemetry,
            threads: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn lock_settings(&self) -> Result<MutexGuard<'_, Settings>> {
        self.settings
            .lock()
            .map_err(|_| SnarlError::lock_poisoned("settings"))
    }

    pub fn lock_processing(&self) -> Result<MutexGuard<'_, ProcessingOptions>> {
        self.processing
            .lock()
            .map_err(|_| SnarlError::lock_poisoned("processing options"))
    }

    pub(crate) fn lock_threads(&self) -> Result<MutexGuard<'_, Option<EngineThreads>>> {
        self.threads
            .lock()
            .map_err(|_| SnarlError::lock_poisoned("engine threads"))
    }

    /// Handles for an engine run over `exchange`.
    pub fn handles(&self, exchange: SharedExchange, clock: MonotonicClock) -> ProcessingHandles {
        ProcessingHandles {
            settings: self.settings.clone(),
            switches: self.switches.clone(),
            exchange,
            statistics: self.statistics.clone(),
            status: self.status.clone(),
            running: self.running.clone(),
            capture_finished: Arc::new(AtomicBool::new(false)),
            clock,
        }
    }

    /// Reports the current switch set to telemetry.
    pub fn report_switches(&self) {
        self.telemetry.record(TelemetryEvent::ModuleEnabled {
            running: self.is_running(),
            modules: self.switches.describe(),
        });
    }
}
