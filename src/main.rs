#![warn(clippy::all)]

use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

use snarl::commands::config::{list_configs, load_config, load_config_from, save_config};
use snarl::commands::{
    get_status, handle_control_line, set_module_enabled, start_processing, stop_processing,
    update_settings, PacketProcessingState,
};
use snarl::network::modules::registry::ModuleKind;
use snarl::network::processing::loopback::{CountingSink, LoopbackSource};
use snarl::settings::Settings;
use snarl::{Result, SnarlError};

/// Flags that a loaded configuration would silently replace.
const CONFIG_OVERRIDES: [&str; 10] = [
    "tick_ms",
    "LagOptions",
    "DropOptions",
    "ThrottleOptions",
    "DuplicateOptions",
    "ReorderOptions",
    "TamperOptions",
    "ResetOptions",
    "BandwidthOptions",
    "RateLimitOptions",
];

/// Shapes synthetic traffic through the packet pipeline.
#[derive(Parser, Debug)]
#[command(name = "snarl", version, about)]
struct Cli {
    /// Configuration to apply: a file path or the name of a saved configuration.
    /// Module parameters and the tick interval then come from the file only.
    #[arg(long, conflicts_with_all = CONFIG_OVERRIDES)]
    config: Option<String>,

    /// Arm a module (repeatable), e.g. --enable lag --enable rate_limit
    #[arg(long = "enable", value_name = "MODULE")]
    enable: Vec<ModuleKind>,

    /// Control lines applied before starting, e.g. "LagDelayMs 100"
    #[arg(long = "control", value_name = "LINE")]
    control: Vec<String>,

    /// Save the resulting configuration under this name
    #[arg(long)]
    save: Option<String>,

    /// List saved configurations and exit
    #[arg(long)]
    list_configs: bool,

    /// Stop automatically after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Interval between pipeline ticks in milliseconds (1-100)
    #[arg(long, default_value_t = 40)]
    tick_ms: u64,

    /// Synthetic packets generated per second
    #[arg(long, default_value_t = 1_000)]
    pps: u32,

    /// Payload bytes per synthetic packet
    #[arg(long, default_value_t = 512)]
    payload: usize,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    settings: Settings,
}

/// Initialize the application logger.
///
/// `RUST_LOG` overrides the default level.
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.list_configs {
        for name in list_configs()? {
            println!("{}", name);
        }
        return Ok(());
    }

    info!("Snarl starting up");
    let state = PacketProcessingState::new();

    match &cli.config {
        Some(config) if Path::new(config).is_file() => {
            load_config_from(&state, Path::new(config))?;
        }
        Some(name) => {
            load_config(&state, name)?;
        }
        None => {
            update_settings(&state, cli.settings.clone())?;
            state.lock_processing()?.tick_interval_ms = cli.tick_ms;
        }
    }

    for &kind in &cli.enable {
        set_module_enabled(&state, kind, true)?;
    }

    for line in &cli.control {
        let response = handle_control_line(&state, line);
        match response.outcome {
            Ok(command) => info!("{} -> {}", command, response.reply),
            Err(e) => warn!("Ignoring control line {:?}: {}", line, e),
        }
    }

    if let Some(name) = &cli.save {
        let path = save_config(&state, name)?;
        info!("Saved configuration to {}", path.display());
    }

    let running = state.running.clone();
    ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
        .map_err(|e| SnarlError::Io(io::Error::other(e)))?;

    let sink = CountingSink::new();
    let counters = sink.counters();
    start_processing(
        &state,
        LoopbackSource::new(cli.pps, cli.payload),
        sink,
        cli.timeout.map(Duration::from_secs),
    )?;

    info!("Shaping synthetic traffic, press Ctrl-C to stop");

    let status_interval = Duration::from_secs(2);
    let mut last_status = Instant::now();
    while state.is_running() {
        thread::sleep(Duration::from_millis(100));
        if last_status.elapsed() >= status_interval {
            info!("{}", get_status(&state)?.status_line);
            last_status = Instant::now();
        }
    }

    let summary = stop_processing(&state)?;
    info!(
        "Sent {} of {} packets ({} bytes) in {} ticks",
        counters.packets(),
        summary.received,
        counters.bytes(),
        summary.ticks
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_rejects_parameter_flags() {
        for flag in [
            &["--tick-ms", "10"][..],
            &["--lag-time", "100"],
            &["--rate-mbps", "8"],
            &["--drop-inbound", "false"],
        ] {
            let args = ["snarl", "--config", "slow"].iter().chain(flag.iter());
            let err = Cli::try_parse_from(args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ArgumentConflict, "{:?}", flag);
        }
    }

    #[test]
    fn test_config_combines_with_run_flags() {
        let cli = Cli::try_parse_from([
            "snarl", "--config", "slow", "--enable", "lag", "--pps", "50", "--timeout", "3",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("slow"));
        assert_eq!(cli.enable, vec![ModuleKind::Lag]);
        assert_eq!(cli.settings, Settings::default());
    }

    #[test]
    fn test_parameter_flags_without_config() {
        let cli = Cli::try_parse_from(["snarl", "--lag-time", "250", "--tick-ms", "20"]).unwrap();
        assert_eq!(cli.settings.lag.time_ms, 250);
        assert_eq!(cli.tick_ms, 20);
    }
}
