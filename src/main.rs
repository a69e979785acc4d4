//! # SDS011 Logger
//!
//! Record particulate-matter readings from an SDS011 sensor and serve them
//! over HTTP.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (TOML file plus command-line overrides)
//!    - Set up logging with tracing subscriber
//!    - Replay historic `sds011_<ts>.dat` logs and open a new live log
//!
//! 2. **Main Loop**
//!    - Ingestion task: read frames from the sensor, append readings
//!    - Query server: serve `/data.json` snapshots
//!    - Handle Ctrl+C for graceful shutdown
//!
//! # Examples
//!
//! ```bash
//! sds011-logger --port /dev/ttyUSB0 --period 1 --log-dir ./logs
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use sds011_logger::clock::SystemClock;
use sds011_logger::config::{Config, LoggingConfig, SerialConfig};
use sds011_logger::ingest::{run_ingestion, IngestOptions};
use sds011_logger::serial::{SensorSerial, DEFAULT_DEVICE_PATHS};
use sds011_logger::server::{self, QueryState};
use sds011_logger::telemetry::decoder::LogDecoder;
use sds011_logger::telemetry::series::SeriesStore;

/// Command-line arguments; each one overrides the matching config value
#[derive(Debug, Parser)]
#[command(name = "sds011-logger", version, about = "Log and serve SDS011 particulate-matter readings")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device of the sensor (auto-detected when omitted)
    #[arg(long)]
    port: Option<String>,

    /// Sensor working period in minutes (0 = continuous)
    #[arg(long)]
    period: Option<u8>,

    /// Query server address
    #[arg(long)]
    listen: Option<String>,

    /// Directory of the persistent reading logs
    #[arg(long)]
    log_dir: Option<String>,

    /// Only serve history, do not open the sensor
    #[arg(long)]
    no_serial: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(period) = self.period {
            config.sensor.period_minutes = period;
        }
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.storage.log_dir = log_dir.clone();
        }
        if self.no_serial {
            config.serial.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    let _log_guard = init_logging(&config.logging)?;
    info!("SDS011 Logger v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut decoder = LogDecoder::open(&config.storage.log_dir, Arc::new(SeriesStore::new()), SystemClock)?;
    let series = decoder.series();

    let mut ingestion: Option<JoinHandle<sds011_logger::error::Result<u64>>> = None;
    if config.serial.enabled {
        let mut port = open_sensor(&config.serial)?;
        let options = IngestOptions {
            period_minutes: config.sensor.period_minutes,
            warmup: Duration::from_millis(config.serial.warmup_ms),
            read_timeout: Duration::from_secs(config.serial.read_timeout_s),
        };
        ingestion = Some(tokio::spawn(async move {
            run_ingestion(&mut port, &mut decoder, &options).await
        }));
    } else {
        info!("Serial input disabled, serving history only");
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut query_server: Option<JoinHandle<sds011_logger::error::Result<()>>> = None;
    if config.server.enabled {
        let state = QueryState::new(series, Arc::new(SystemClock));
        query_server = Some(tokio::spawn(server::serve(
            config.listen_addr()?,
            state,
            async move {
                let _ = shutdown_rx.await;
            },
        )));
    }

    info!("Press Ctrl+C to exit");

    tokio::select! {
        result = join_optional(ingestion.as_mut()) => {
            let readings = result??;
            warn!("Serial stream ended after {} readings, serving history only", readings);
            tokio::signal::ctrl_c().await?;
        }
        result = join_optional(query_server.as_mut()) => {
            result??;
            bail!("Query server stopped unexpectedly");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
        }
    }

    info!("Received Ctrl+C, shutting down...");
    if let Some(handle) = ingestion {
        handle.abort();
    }
    let _ = shutdown_tx.send(());
    if let Some(handle) = query_server {
        if let Err(e) = handle.await? {
            error!("Query server failed during shutdown: {}", e);
        }
    }

    Ok(())
}

/// Await a task if there is one, otherwise never complete
async fn join_optional<T>(handle: Option<&mut JoinHandle<T>>) -> std::result::Result<T, JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn open_sensor(config: &SerialConfig) -> sds011_logger::error::Result<SensorSerial> {
    if config.port.is_empty() {
        SensorSerial::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)
    } else {
        SensorSerial::open_with_paths(&[config.port.as_str()], config.baud_rate)
    }
}

/// Install the tracing subscriber; the guard must live as long as logging
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let (file_layer, guard) = match &config.file {
        Some(file) => {
            let path = Path::new(file);
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("logging file '{}' has no file name", file))?;
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
