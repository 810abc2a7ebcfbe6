//! Runs a collection cycle at startup and then on a fixed interval until
//! shutdown is requested.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;

use crate::kubernetes::ReportSource;
use crate::orchestrator::Orchestrator;

/// Receiving side of the shutdown signal. Cheap to clone.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Requests shutdown for every [`Shutdown`] created alongside it.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

pub fn shutdown_channel() -> (ShutdownHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx: Arc::new(tx) }, Shutdown { rx })
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested. Never resolves if every
    /// handle is dropped without triggering.
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Waits for SIGINT or SIGTERM.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down..."),
                    _ = terminate.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C, shutting down...");
    }
}

pub struct Scheduler<S> {
    orchestrator: Arc<Orchestrator<S>>,
    interval: Duration,
}

impl<S: ReportSource> Scheduler<S> {
    pub fn new(orchestrator: Arc<Orchestrator<S>>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
        }
    }

    /// Runs until `shutdown` fires and returns the number of cycles run.
    /// Cycles never overlap; a failing cycle is followed by the next tick.
    pub async fn run(&self, mut shutdown: Shutdown) -> usize {
        let mut cycles = 0;

        if shutdown.is_requested() {
            info!("Shutdown requested before the first collection");
            return cycles;
        }

        info!("Running initial collection...");
        self.orchestrator.run_cycle(&shutdown).await;
        cycles += 1;

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, "Starting periodic collection");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.requested() => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    info!("Running scheduled collection...");
                    self.orchestrator.run_cycle(&shutdown).await;
                    cycles += 1;
                }
            }
        }

        cycles
    }
}
