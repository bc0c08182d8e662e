//! Gaze Stack Watcher CLI
//!
//! Health monitor for eye-gaze input streams.

use clap::{Parser, Subcommand};
use gaze_stack_watcher::{
    config::Config,
    core::{GazeMonitor, RunEnd},
    sink::{DisplayHistory, DisplaySurface, LogSink},
    source::{EventSource, ReplayConfig, ReplaySource, SimulatedSource, SimulationConfig},
    stats::{create_shared_stats_with_persistence, MonitorStats},
    VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gaze-watcher")]
#[command(version = VERSION)]
#[command(about = "Health monitor for eye-gaze input streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded JSON-lines event stream through the monitor
    Watch {
        /// Recording to replay, or - for stdin
        #[arg(long, short)]
        input: PathBuf,

        /// Activity log file (defaults to the configured path)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Deliver events at their recorded pace
        #[arg(long)]
        realtime: bool,
    },

    /// Run a synthetic gaze stream through the monitor
    Simulate {
        /// Length of the simulated stream in seconds
        #[arg(long, default_value = "10")]
        seconds: u64,

        /// Activity log file (defaults to the configured path)
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Show cumulative monitoring statistics
    Status {
        /// Clear the persisted statistics
        #[arg(long)]
        reset: bool,
    },

    /// Show configuration
    Config {
        /// Write the current settings to the configuration file
        #[arg(long)]
        init: bool,
    },
}

/// Display surface that echoes lines to the terminal as they are shown.
struct ConsoleDisplay {
    history: DisplayHistory,
}

impl DisplaySurface for ConsoleDisplay {
    fn insert_head(&mut self, line: String) {
        println!("{line}");
        self.history.insert_head(line);
    }

    fn replace_head(&mut self, line: String) {
        println!("{line}");
        self.history.replace_head(line);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            input,
            log,
            realtime,
        } => {
            let source = match ReplaySource::from_path(&input, ReplayConfig { realtime }) {
                Ok(source) => source,
                Err(e) => {
                    eprintln!("Error opening recording: {e}");
                    std::process::exit(1);
                }
            };
            cmd_run(source, log);
        }
        Commands::Simulate { seconds, log } => {
            let source = SimulatedSource::new(SimulationConfig {
                duration: Duration::from_secs(seconds),
                realtime: true,
            });
            cmd_run(source, log);
        }
        Commands::Status { reset } => {
            if reset {
                cmd_reset_stats();
            } else {
                cmd_status();
            }
        }
        Commands::Config { init } => {
            if init {
                cmd_init_config();
            } else {
                cmd_config();
            }
        }
    }
}

fn cmd_run(mut source: impl EventSource, log: Option<PathBuf>) {
    println!("Gaze Stack Watcher v{VERSION}");
    println!();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load configuration, using defaults: {e}");
            Config::default()
        }
    };
    if let Some(path) = log {
        config.log_path = path;
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("  Report interval: {}s", config.report_interval.as_secs());
    println!("  Input pause timeout: {}s", config.input_pause_timeout.as_secs());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            std::process::exit(1);
        }
    };

    let stats = create_shared_stats_with_persistence(config.stats_path());
    let display = ConsoleDisplay {
        history: DisplayHistory::new(config.max_display_entries),
    };
    let mut sink = LogSink::new(display, runtime.handle().clone(), stats.clone())
        .with_flush_delay(config.flush_delay);
    sink.attach_file(&config.log_path);

    if let Some(path) = sink.file() {
        println!("  Log file: {path:?}");
    }

    let mut monitor = GazeMonitor::new(&config, sink, stats.clone());
    println!("  Instance: {}", monitor.instance_id());
    println!();
    println!("Press Ctrl+C to stop");
    println!();
    monitor.start();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    if let Err(e) = source.start() {
        eprintln!("Error starting source: {e}");
        std::process::exit(1);
    }

    match monitor.run(source.receiver(), &running) {
        RunEnd::SourceFinished => tracing::info!("Input source finished"),
        RunEnd::Stopped => tracing::info!("Interrupted"),
    }
    source.stop();

    println!();
    println!("Stopping...");
    match runtime.block_on(monitor.shutdown()) {
        Ok(sink) => {
            if let Some(e) = sink.last_error() {
                eprintln!("Warning: Some log writes failed: {e}");
            }
        }
        Err(e) => eprintln!("Error writing activity log: {e}"),
    }

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save statistics: {e}");
    }

    println!();
    println!("{}", stats.summary());
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Gaze Stack Watcher Status");
    println!("=========================");
    println!();
    println!("Log file: {:?}", config.log_path);
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                for (label, key) in [
                    ("Samples processed", "samples_processed"),
                    ("Windows completed", "windows_completed"),
                    ("Blinks detected", "blinks"),
                    ("Anomalies logged", "anomalies"),
                    ("Lines persisted", "lines_persisted"),
                    ("Write failures", "write_failures"),
                ] {
                    if let Some(value) = stats.get(key) {
                        println!("  {label}: {value}");
                    }
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_reset_stats() {
    let config = Config::load().unwrap_or_default();
    let stats = MonitorStats::with_persistence(config.stats_path());
    stats.reset();
    if let Err(e) = stats.save() {
        eprintln!("Error saving statistics: {e}");
        std::process::exit(1);
    }
    println!("Statistics cleared.");
}

fn cmd_init_config() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.save() {
        eprintln!("Error saving configuration: {e}");
        std::process::exit(1);
    }
    println!("Configuration written to {:?}", Config::config_path());
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not install Ctrl+C handler: {e}");
    }
}
