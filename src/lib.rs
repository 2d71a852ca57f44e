pub mod channels;
pub mod config;
pub mod datalog_writer;
pub mod error;
pub mod http;
pub mod influx;
pub mod options;
pub mod prelude;
pub mod readings_cache;
pub mod utils;
pub mod uvr;

pub use error::{DecodeError, Error};

// Get the package version from Cargo.toml
pub const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::datalog_writer::DatalogWriter;
use crate::http::Http;
use crate::influx::Influx;
use crate::uvr::controller::Controller;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Sets up env_logger with the `[<time> <level> <module>] <message>` line
/// format. `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str) -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init()?;

    Ok(())
}

/// Holds every running component so they can be stopped together.
#[derive(Clone)]
pub struct Components {
    pub controller: Arc<Controller>,
    pub readings_cache: Arc<ReadingsCache>,
    pub influx: Arc<Influx>,
    pub datalog_writer: Arc<DatalogWriter>,
    pub http: Arc<Http>,
}

impl Components {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self {
            controller: Arc::new(Controller::new(config.clone(), channels.clone())),
            readings_cache: Arc::new(ReadingsCache::new(channels.clone())),
            influx: Arc::new(Influx::new(config.clone(), channels.clone())),
            datalog_writer: Arc::new(DatalogWriter::new(config.clone(), channels.clone())),
            http: Arc::new(Http::new(config, channels)),
        }
    }

    /// Stops the controller first so no new snapshots are produced, then
    /// the sinks.
    pub fn stop(&self) {
        info!("Stopping all components...");

        self.controller.stop();
        self.influx.stop();
        self.datalog_writer.stop();
        self.http.stop();
        self.readings_cache.stop();
    }
}

fn spawn<F>(name: &'static str, task: F) -> JoinHandle<Result<()>>
where
    F: std::future::Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = task.await;
        if let Err(e) = &result {
            error!("{} task failed: {}", name, e);
        }
        result
    })
}

/// Runs all components until `shutdown_rx` fires or the controller gives up.
pub async fn app(mut shutdown_rx: broadcast::Receiver<()>, config: ConfigWrapper) -> Result<()> {
    info!("uvr-bridge {} starting", CARGO_PKG_VERSION);

    let channels = Channels::new();
    let components = Components::new(config, channels);

    let c = components.clone();
    let readings_cache_handle = spawn("readings cache", async move { c.readings_cache.start().await });

    let c = components.clone();
    let influx_handle = spawn("influx", async move { c.influx.start().await });

    let c = components.clone();
    let datalog_handle = spawn("datalog", async move { c.datalog_writer.start().await });

    let c = components.clone();
    let http_handle = spawn("http", async move { c.http.start().await });

    let c = components.clone();
    let mut controller_handle = spawn("controller", async move { c.controller.start().await });

    let controller_result = tokio::select! {
        _ = shutdown_rx.recv() => None,
        r = &mut controller_handle => Some(r),
    };

    // a disabled controller returns straight away; keep serving until told to stop
    let controller_result = match controller_result {
        Some(Ok(Ok(()))) => {
            let _ = shutdown_rx.recv().await;
            Some(Ok(Ok(())))
        }
        r => r,
    };

    info!("Shutting down, stopping components...");
    components.stop();

    let controller_result = match controller_result {
        Some(r) => r,
        None => controller_handle.await,
    };

    for (name, handle) in [
        ("influx", influx_handle),
        ("datalog", datalog_handle),
        ("http", http_handle),
        ("readings cache", readings_cache_handle),
    ] {
        if let Err(e) = handle.await {
            error!("Error waiting for {} task: {}", name, e);
        }
    }

    info!("Application shutdown complete");

    controller_result?
}
