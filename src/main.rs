use clap::Parser;
use govee_collector::app::{RealScanner, RunError, run_loop};
use govee_collector::config::{Config, ConfigError};
use govee_collector::sink::memcache::{MemcacheSink, MemcacheStore};
use govee_collector::sink::metrics::{METRICS_PORT, Metrics, MetricsSink, serve};
use govee_collector::sink::mqtt::MqttSink;
use govee_collector::sink::{ConnectError, Sink};
use std::panic::{self, PanicHookInfo};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

#[derive(Parser, Debug)]
#[command(author, about, version)]
struct Options {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG_FILE")]
    config: PathBuf,
}

/// Startup or runtime failure, any of which ends the process non-zero.
#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Load configuration, bring up every enabled sink (failing fast on
/// unreachable backends) and run the receive loop until interrupted.
async fn run(options: Options) -> Result<(), AppError> {
    let config = Config::load(&options.config)?;
    init_logging(&config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let hostname = gethostname::gethostname().to_string_lossy().into_owned();

    let metrics = Metrics::new()?;
    serve(metrics.clone(), METRICS_PORT).await?;

    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(MetricsSink::new(metrics))];

    if let Some(mqtt) = config.collector.mqtt.as_ref().filter(|m| m.enable) {
        info!(server = %mqtt.server, port = mqtt.port, "connecting to MQTT");
        sinks.push(Box::new(
            MqttSink::connect(&mqtt.server, mqtt.port, &hostname).await?,
        ));
    }

    if let Some(memcache) = config.collector.memcache.as_ref().filter(|m| m.enable) {
        info!(server = %memcache.server, port = memcache.port, "connecting to memcached");
        let store = MemcacheStore::connect(&memcache.server, memcache.port)?;
        sinks.push(Box::new(MemcacheSink::new(store, hostname.clone())));
    }

    info!(mode = ?config.collector.mode, devices = config.devices.len(), "running");
    run_loop(
        config.collector.mode,
        &config.devices,
        &hostname,
        &RealScanner,
        &sinks,
    )
    .await?;

    Ok(())
}

fn init_logging(config: &Config) -> Result<(), ConfigError> {
    use tracing_subscriber::EnvFilter;

    let level = config.log_level()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // (e.g., systemd) that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();

    match run(options).await {
        Ok(_) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            eprintln!("error: {}", why);
            std::process::exit(EXIT_ERROR);
        }
    }
}
