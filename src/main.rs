//! keymon CLI
//!
//! Keyboard and mouse activity monitor with periodic reporting.

use clap::{Parser, Subcommand};
use keymon::{
    collector::{default_device_paths, discover_devices, DeviceSet, EventSourceSet},
    config::Config,
    core::{MonitorLoop, SystemClock},
    logging,
    report::{EndpointConfig, HttpTransport, LineSink, Reporter},
    stats::ActivityStats,
    VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "keymon")]
#[command(version = VERSION)]
#[command(about = "Keyboard and mouse activity monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start monitoring and reporting
    Start {
        /// Base URL of the collection endpoint
        #[arg(long)]
        url: Option<String>,

        /// Report interval in seconds
        #[arg(long)]
        interval: Option<u64>,

        /// Input device to read (repeat for several); auto-detected if omitted
        #[arg(long = "device")]
        devices: Vec<PathBuf>,

        /// Local activity log
        #[arg(long)]
        sink: Option<PathBuf>,

        /// Also write the mouse count to the local activity log
        #[arg(long)]
        log_mouse: bool,

        /// Verbose logging
        #[arg(long)]
        debug: bool,
    },

    /// List input devices that can be monitored
    Devices,

    /// Show configuration
    Config,

    /// Run the collection endpoint (requires the server feature)
    #[cfg(feature = "server")]
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:5001")]
        listen: std::net::SocketAddr,

        /// File the received reports are kept in
        #[arg(long)]
        history: Option<PathBuf>,

        /// Maximum number of reports kept
        #[arg(long, default_value_t = keymon::server::DEFAULT_HISTORY_CAPACITY)]
        capacity: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            url,
            interval,
            devices,
            sink,
            log_mouse,
            debug,
        } => {
            let mut config = match Config::load() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: Could not load {}: {e}", Config::config_path().display());
                    std::process::exit(1);
                }
            };
            if let Some(url) = url {
                config.remote_endpoint = url;
            }
            if let Some(secs) = interval {
                config.report_interval_ms = secs.saturating_mul(1000);
            }
            if !devices.is_empty() {
                config.device_paths = devices;
            }
            if let Some(sink) = sink {
                config.sink_path = sink;
            }
            config.sink_include_mouse |= log_mouse;
            config.debug |= debug;

            cmd_start(config);
        }
        Commands::Devices => {
            cmd_devices();
        }
        Commands::Config => {
            cmd_config();
        }
        #[cfg(feature = "server")]
        Commands::Serve {
            listen,
            history,
            capacity,
        } => {
            cmd_serve(listen, history, capacity);
        }
    }
}

fn cmd_start(mut config: Config) {
    logging::init(config.debug);

    println!("keymon v{VERSION}");
    println!();

    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    if config.device_paths.is_empty() {
        config.device_paths = default_device_paths();
    }

    // Open devices before anything else so a permission problem fails fast.
    let sources = match DeviceSet::open_all(&config.device_paths) {
        Ok(sources) => sources,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Run `keymon devices` to see which input devices are readable,");
            eprintln!("or pass them explicitly with --device /dev/input/eventN.");
            std::process::exit(1);
        }
    };

    let sink = match LineSink::open(&config.sink_path, config.sink_include_mouse) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!(
                "Error: Could not open activity log {}: {e}",
                config.sink_path.display()
            );
            std::process::exit(1);
        }
    };

    let endpoint = EndpointConfig::new(config.remote_endpoint.clone(), config.request_timeout());
    let transport = match HttpTransport::new(endpoint.timeout) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Monitoring {} device(s):", sources.live_count());
    #[cfg(target_os = "linux")]
    for (id, source) in sources.sources() {
        println!("  {id}: {} ({}) {}", source.path().display(), source.role(), source.name());
    }
    println!("  Report interval: {}ms", config.report_interval_ms);
    println!("  Endpoint: {}", endpoint.post_event_url());
    println!("  Activity log: {}", config.sink_path.display());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats = Arc::new(ActivityStats::with_persistence(config.stats_path()));
    let reporter = Reporter::new(sink, transport, endpoint.post_event_url());
    let mut monitor =
        MonitorLoop::new(sources, SystemClock::new(), reporter, &config.loop_settings())
            .with_stats(stats.clone());

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    monitor.run(&running);

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
}

fn cmd_devices() {
    let devices = discover_devices();

    if devices.is_empty() {
        println!("No readable input devices found.");
        println!("Device nodes under /dev/input usually need root or the 'input' group.");
        return;
    }

    println!("Input devices");
    println!("=============");
    println!();
    for device in &devices {
        println!(
            "  {:<24} {:<9} {}",
            device.path.display().to_string(),
            device.role.to_string(),
            device.name
        );
    }

    let defaults = default_device_paths();
    if !defaults.is_empty() {
        println!();
        println!("Used by default:");
        for path in defaults {
            println!("  {}", path.display());
        }
    }
}

fn cmd_config() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
    if let Err(e) = config.validate() {
        println!();
        println!("Warning: {e}");
    }
}

#[cfg(feature = "server")]
fn cmd_serve(listen: std::net::SocketAddr, history: Option<PathBuf>, capacity: usize) {
    use keymon::server::{run, ServerConfig};

    logging::init(false);

    let history_path = history.unwrap_or_else(|| Config::data_dir().join("key_mouse_events.json"));
    let config = ServerConfig::new(listen, history_path, capacity);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Could not start runtime: {e}");
            std::process::exit(1);
        }
    };

    let result: anyhow::Result<()> = runtime.block_on(async move {
        let (addr, shutdown_tx) = run(config).await?;
        println!("Collection endpoint listening on http://{addr}");
        println!("Press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
        let _ = shutdown_tx.send(());
        Ok(())
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
