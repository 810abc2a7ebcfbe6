use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use report_exporter::{
    config::Config,
    kubernetes::KubeReportSource,
    metrics,
    scheduler::{self, Scheduler},
    sinks::SinkSet,
    Orchestrator,
};

#[derive(Debug, Parser)]
#[command(name = "report-exporter", version, about)]
struct Cli {
    /// Run a single collection cycle and exit.
    #[arg(long)]
    once: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_tracing();
    info!("Starting report exporter...");

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;
    info!(
        cluster = %config.cluster_name,
        bucket = ?config.object_store.as_ref().map(|s| &s.bucket),
        fs_dir = ?config.fs_output_dir,
        interval = ?config.sync_interval,
        page_size = config.page_size,
        "Loaded configuration"
    );
    if config.object_store.is_none() {
        info!("S3_BUCKET not set, object storage upload disabled");
    }

    metrics::register_metrics();

    let sinks = Arc::new(SinkSet::from_config(&config).context("failed to set up sinks")?);
    let source = Arc::new(
        KubeReportSource::try_default()
            .await
            .context("failed to create Kubernetes client")?,
    );
    let orchestrator = Arc::new(Orchestrator::from_config(&config, source, sinks));

    let (handle, shutdown) = scheduler::shutdown_channel();

    if cli.once {
        orchestrator.run_cycle(&shutdown).await;
        return Ok(());
    }

    #[cfg(feature = "server")]
    if let Some(addr) = config.server.addr.clone() {
        let server = report_exporter::server::Server::new(
            &config.cluster_name,
            orchestrator.last_cycle(),
        );
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = server.start(&addr, server_shutdown).await {
                warn!("Metrics server stopped: {}", e);
            }
        });
    }

    tokio::spawn(async move {
        scheduler::wait_for_signal().await;
        handle.trigger();
    });

    let cycles = Scheduler::new(orchestrator, config.sync_interval)
        .run(shutdown)
        .await;
    info!(cycles, "Shut down cleanly");

    Ok(())
}
