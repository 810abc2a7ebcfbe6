mod routes;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::orchestrator::LastCycle;
use crate::scheduler::Shutdown;

pub struct ServerState {
    pub cluster_name: String,
    pub last_cycle: LastCycle,
}

/// Health and Prometheus endpoints alongside the collection loop.
pub struct Server {
    state: Arc<ServerState>,
}

impl Server {
    pub fn new(cluster_name: &str, last_cycle: LastCycle) -> Self {
        Self {
            state: Arc::new(ServerState {
                cluster_name: cluster_name.to_string(),
                last_cycle,
            }),
        }
    }

    pub fn build_router(self) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route("/metrics", get(routes::metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state)
    }

    pub async fn start(self, addr: &str, mut shutdown: Shutdown) -> crate::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("Metrics server listening on {}", addr);

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move { shutdown.requested().await })
            .await?;
        Ok(())
    }
}
