use crate::error::Result;
use crate::network::core::PacketData;
use crate::network::modules::stats::PacketProcessingStatistics;
use crate::network::modules::traits::ModuleContext;
use crate::network::processing::exchange::{lock_exchange, SharedExchange};
use crate::network::processing::module_state::ModuleSwitches;
use crate::network::processing::pipeline::Pipeline;
use crate::network::processing::status::StatusMonitor;
use crate::settings::{ProcessingOptions, Settings};
use crate::utils::{log_statistics, MonotonicClock};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

/// Where shaped packets go once the pipeline is done with them.
pub trait PacketSink: Send {
    fn send(&mut self, packet: &PacketData) -> Result<()>;
}

/// Shared state the shaping thread works with.
#[derive(Clone)]
pub struct ProcessingHandles {
    pub settings: Arc<Mutex<Settings>>,
    pub switches: Arc<ModuleSwitches>,
    pub exchange: SharedExchange,
    pub statistics: Arc<RwLock<PacketProcessingStatistics>>,
    pub status: Arc<Mutex<StatusMonitor>>,
    pub running: Arc<AtomicBool>,
    /// Raised once the capture thread has exited
    pub capture_finished: Arc<AtomicBool>,
    pub clock: MonotonicClock,
}

/// Totals reported when the shaping loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub ticks: u64,
    pub received: usize,
    pub sent: usize,
}

/// Runs the shaping loop until `running` is cleared.
///
/// Every tick the loop:
/// 1. Locks the exchange and runs the pipeline over the shared queue
/// 2. Takes everything left on the shared queue and unlocks
/// 3. Hands those packets to the sink
///
/// The status refresh runs every `status_every_ticks` ticks and throughput
/// is logged every two seconds. On shutdown the loop first waits for the
/// capture thread to exit, so a batch captured while stopping still reaches
/// the shared queue. Then every started module is closed and everything
/// left is sent.
///
/// # Arguments
///
/// * `handles` - Settings, switches, exchange and statistics shared with the
///   other threads
/// * `options` - Tick timing
/// * `sink` - Receives packets that leave the pipeline
pub fn start_packet_processing<K: PacketSink>(
    handles: ProcessingHandles,
    options: ProcessingOptions,
    mut sink: K,
) -> Result<ProcessingSummary> {
    let tick_interval = Duration::from_millis(options.effective_tick_ms());
    let status_every = u64::from(options.effective_status_every());
    let log_interval = Duration::from_secs(2);
    let mut last_log_time = Instant::now();

    let mut pipeline = Pipeline::new();
    let mut summary = ProcessingSummary::default();
    let mut logged_received = 0;
    let mut logged_sent = 0;

    info!(
        "Starting packet shaping with a {} ms tick",
        tick_interval.as_millis()
    );

    while handles.running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        let (ready, captured) = run_tick(&handles, &mut pipeline)?;
        summary.received = captured;
        summary.sent += send_packets(&mut sink, &ready);
        summary.ticks += 1;

        if summary.ticks % status_every == 0 {
            refresh_status(&handles);
        }

        if last_log_time.elapsed() >= log_interval {
            log_statistics(summary.received - logged_received, summary.sent - logged_sent);
            logged_received = summary.received;
            logged_sent = summary.sent;
            last_log_time = Instant::now();
        }

        if let Some(remaining) = tick_interval.checked_sub(tick_start.elapsed()) {
            thread::sleep(remaining);
        }
    }

    wait_for_capture(&handles, tick_interval);

    debug!("Closing shaping modules");
    let (leftovers, captured) = {
        let mut exchange = lock_exchange(&handles.exchange)?;
        let shared = exchange.shared;
        let mut ctx = ModuleContext::new(
            &mut exchange.store,
            shared,
            handles.clock.now_ms(),
            &handles.statistics,
        );
        let closed = pipeline.close_all(&mut ctx)?;
        debug!("Closed {} shaping modules", closed);
        (exchange.take_ready(), exchange.captured())
    };

    summary.received = captured;
    summary.sent += send_packets(&mut sink, &leftovers);
    log_statistics(summary.received - logged_received, summary.sent - logged_sent);
    info!(
        "Packet shaping stopped after {} ticks, {} sent of {} received",
        summary.ticks, summary.sent, summary.received
    );

    Ok(summary)
}

/// Runs the pipeline once and takes the packets it left on the shared queue.
///
/// Returns them together with the exchange's running capture count.
fn run_tick(
    handles: &ProcessingHandles,
    pipeline: &mut Pipeline,
) -> Result<(Vec<PacketData>, usize)> {
    let mut exchange = lock_exchange(&handles.exchange)?;
    let shared = exchange.shared;
    let mut ctx = ModuleContext::new(
        &mut exchange.store,
        shared,
        handles.clock.now_ms(),
        &handles.statistics,
    );

    match handles.settings.lock() {
        Ok(settings) => {
            if let Err(e) = pipeline.tick(&settings, &handles.switches, &mut ctx) {
                error!("Error processing packets: {}", e);
            }
        }
        Err(e) => {
            error!("Failed to acquire lock on shaping settings: {}", e);
        }
    }

    Ok((exchange.take_ready(), exchange.captured()))
}

/// Blocks until the capture thread reports that it has exited.
fn wait_for_capture(handles: &ProcessingHandles, poll: Duration) {
    if handles.capture_finished.load(Ordering::SeqCst) {
        return;
    }

    debug!("Waiting for the packet receiving thread to finish");
    while !handles.capture_finished.load(Ordering::SeqCst) {
        thread::sleep(poll);
    }
}

fn send_packets<K: PacketSink>(sink: &mut K, packets: &[PacketData]) -> usize {
    let mut sent = 0;
    for packet in packets {
        if let Err(e) = sink.send(packet) {
            error!("Failed to send packet: {}", e);
            continue;
        }
        sent += 1;
    }
    sent
}

fn refresh_status(handles: &ProcessingHandles) {
    let stats = match handles.statistics.read() {
        Ok(stats) => stats.rate_limit_stats.clone(),
        Err(e) => {
            error!("Failed to read statistics for the status refresh: {}", e);
            return;
        }
    };

    match handles.status.lock() {
        Ok(mut monitor) => {
            let snapshot = monitor.refresh(&stats, &handles.switches);
            debug!("{}", snapshot.status_line());
        }
        Err(e) => error!("Failed to acquire lock on status monitor: {}", e),
    }
}
