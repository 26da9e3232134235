//! kubedemo - a small HTTP service instrumented for Prometheus
//!
//! Usage:
//!     kubedemo [--config <path>] [--port <port>]
//!
//! See --help for more options.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use kubedemo::config::{load_config, Config};
use kubedemo::http::App;
use kubedemo::metrics::AppMetrics;
use kubedemo::server::Server;
use kubedemo::util::{init_logging, join_task, wait_for_signal, ShutdownSignal};

/// A small HTTP service instrumented for Prometheus.
#[derive(Parser, Debug)]
#[command(name = "kubedemo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Override the listen port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load configuration from '{}'", path.display()),
        None => "failed to load default configuration".to_string(),
    })?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // CLI overrides config
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.global.log_level);

    init_logging(log_level, &config.global.log_format);

    if cli.validate {
        info!("Configuration is valid");
        println!("Configuration is valid.");
        println!("  Listen: {}", config.listen_addr());
        println!("  App: {} {}", config.app.name, config.app.version);
        println!("  Metrics path: {}", config.metrics.path);
        return Ok(());
    }

    info!(
        config_path = ?cli.config,
        listen = %config.listen_addr(),
        app = %config.app.name,
        version = %config.app.version,
        "kubedemo starting"
    );

    run(config)
}

/// Run the service with the given configuration.
fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(run_async(config))
}

/// Async entry point for the service.
async fn run_async(config: Config) -> Result<()> {
    let shutdown = ShutdownSignal::new();

    let metrics = AppMetrics::new(&config.metrics).context("failed to register metrics")?;
    let lag_probe = metrics
        .runtime()
        .spawn_lag_probe(config.metrics.lag_probe_interval, shutdown.subscribe());

    let app = App::new(&config, metrics);
    let server = Server::bind(&config.server, app)
        .await
        .with_context(|| format!("failed to bind server on {}", config.listen_addr()))?;

    let server = tokio::spawn(server.run(shutdown.subscribe()));

    info!("kubedemo is running");
    info!("press Ctrl+C to stop");

    wait_for_signal().await;
    info!("received shutdown signal");

    shutdown.shutdown();

    let server_ok = join_task("server", server).await;
    join_task("scheduler lag probe", lag_probe).await;

    if !server_ok {
        anyhow::bail!("server task failed");
    }

    info!("kubedemo shut down complete");
    Ok(())
}
