//! hostpulse Binary Entry Point
//!
//! Loads the configuration, registers the built-in collectors and runs the
//! collection loop until SIGINT/SIGTERM.

use std::sync::Arc;

use clap::Parser;
use hostpulse::{
    AppConfig, CollectorRegistry, InfluxSink, LogSink, OrchestratorBuilder, PointBuilder, Sink,
    SinkKind,
    collector::system::register_builtin,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// hostpulse - Periodic Host Telemetry Collector
#[derive(Parser, Debug)]
#[command(name = "hostpulse", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "HOSTPULSE_CONFIG"
    )]
    config: String,

    /// Log points instead of writing them to the sink
    #[arg(long)]
    dry_run: bool,

    /// Sink URL (overrides config file)
    #[arg(long, env = "INFLUX_URL")]
    sink_url: Option<String>,

    /// Sink API token (overrides config file)
    #[arg(long, env = "INFLUX_TOKEN", hide_env_values = true)]
    sink_token: Option<String>,

    /// Destination organisation (overrides config file)
    #[arg(long, env = "INFLUX_ORG")]
    sink_org: Option<String>,

    /// Destination bucket (overrides config file)
    #[arg(long, env = "INFLUX_BUCKET")]
    sink_bucket: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hostpulse=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting monitoring service");

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // CLI > ENV > config file
    if cli.dry_run {
        config.sink.kind = SinkKind::Log;
    }
    if let Some(url) = cli.sink_url {
        config.sink.url = url;
    }
    if let Some(token) = cli.sink_token {
        config.sink.token = Some(token);
    }
    if let Some(org) = cli.sink_org {
        config.sink.org = org;
    }
    if let Some(bucket) = cli.sink_bucket {
        config.sink.bucket = bucket;
    }
    config.validate()?;

    tracing::info!(
        "Sink: {} ({}), bucket: {}, org: {}",
        config.sink.kind,
        config.sink.url,
        config.sink.bucket,
        config.sink.org,
    );

    let sink: Arc<dyn Sink> = match config.sink.kind {
        SinkKind::Influx => Arc::new(InfluxSink::new(
            &config.sink.url,
            config.sink.token.clone(),
            config.sink.timeout,
        )?),
        SinkKind::Log => Arc::new(LogSink::new()),
    };

    let mut registry = CollectorRegistry::new();
    register_builtin(&mut registry, &config.system)?;
    tracing::debug!(collectors = ?registry.names(), "Registered built-in collectors");

    let mut orchestrator = OrchestratorBuilder::new(registry, sink, config.sink.target())
        .point_builder(PointBuilder::new().with_static_tags(config.tags.clone()))
        .default_interval(config.monitoring_interval)
        .collect_timeout(config.collect_timeout)
        .build(&config.modules);

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    tracing::info!("Press Ctrl+C to shutdown");
    orchestrator.run(shutdown).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    tracing::info!("Stopping collection loop...");
    token.cancel();
}
