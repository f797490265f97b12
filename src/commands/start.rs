//! Start processing command.
//!
//! Handles the initialization and starting of the packet processing engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};

use crate::commands::state::{EngineThreads, PacketProcessingState};
use crate::error::{Result, SnarlError};
use crate::network::modules::stats::PacketProcessingStatistics;
use crate::network::processing::{
    receive_packets, start_packet_processing, CaptureFinished, PacketExchange, PacketSink,
    PacketSource,
};
use crate::utils::MonotonicClock;

/// Starts packet processing with the current settings and switches.
///
/// Creates and launches the packet receiving and shaping threads. With a
/// `timeout` the engine stops on its own once that much time has passed;
/// `stop_processing` still has to be called to collect the threads.
///
/// # Arguments
///
/// * `state` - The application state containing shared resources
/// * `source` - Where captured packets come from
/// * `sink` - Where shaped packets go
/// * `timeout` - Optional run time after which the engine stops
///
/// # Returns
///
/// * `Ok(())` - If processing was started successfully
/// * `Err(SnarlError::AlreadyRunning)` - If the engine is running or has not
///   been collected since its last run
pub fn start_processing<S, K>(
    state: &PacketProcessingState,
    source: S,
    sink: K,
    timeout: Option<Duration>,
) -> Result<()>
where
    S: PacketSource + 'static,
    K: PacketSink + 'static,
{
    let mut threads = state.lock_threads()?;
    if state.is_running() || threads.is_some() {
        return Err(SnarlError::AlreadyRunning);
    }

    let options = state.lock_processing()?.clone();
    *state
        .statistics
        .write()
        .map_err(|_| SnarlError::lock_poisoned("statistics"))? = PacketProcessingStatistics::default();
    state
        .status
        .lock()
        .map_err(|_| SnarlError::lock_poisoned("status monitor"))?
        .reset();

    let exchange = PacketExchange::shared();
    let clock = MonotonicClock::new();
    let handles = state.handles(exchange.clone(), clock);

    state.running.store(true, Ordering::SeqCst);

    let running_recv = state.running.clone();
    let finished = CaptureFinished::new(handles.capture_finished.clone());
    let receiver = spawn_or_stop(&state.running, "snarl-capture", move || {
        let _finished = finished;
        receive_packets(source, exchange, running_recv, clock)
    })?;

    let processor = match spawn_or_stop(&state.running, "snarl-shaping", move || {
        start_packet_processing(handles, options, sink)
    }) {
        Ok(processor) => processor,
        Err(e) => {
            let _ = receiver.join();
            return Err(e);
        }
    };

    let engine = EngineThreads {
        receiver,
        processor,
    };

    if let Some(timeout) = timeout {
        let running = state.running.clone();
        let spawned = thread::Builder::new()
            .name("snarl-timeout".to_string())
            .spawn(move || stop_after(running, timeout));
        if let Err(e) = spawned {
            state.running.store(false, Ordering::SeqCst);
            let _ = engine.join();
            return Err(SnarlError::Io(e));
        }
    }

    *threads = Some(engine);
    drop(threads);

    state.report_switches();
    info!("Started packet processing");

    Ok(())
}

/// Spawns a named engine thread, clearing `running` if that fails.
fn spawn_or_stop<T, F>(
    running: &Arc<AtomicBool>,
    name: &str,
    body: F,
) -> Result<thread::JoinHandle<Result<T>>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let thread_name = name.to_string();
    thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let result = body();
            if let Err(e) = &result {
                error!("{} thread failed: {}", thread_name, e);
            }
            result
        })
        .map_err(|e| {
            running.store(false, Ordering::SeqCst);
            SnarlError::Io(e)
        })
}

/// Clears `running` once `timeout` has passed, unless it was cleared first.
fn stop_after(running: Arc<AtomicBool>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    let poll = Duration::from_millis(50);

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            info!("Run time of {:?} reached, stopping packet processing", timeout);
            running.store(false, Ordering::SeqCst);
            return;
        }
        thread::sleep(poll.min(deadline - now));
    }
}
