pub mod catalog;
pub mod collector;
pub mod config;
pub mod kubernetes;
pub mod metrics;
pub mod orchestrator;
pub mod scheduler;
#[cfg(feature = "server")]
pub mod server;
pub mod sinks;

pub use catalog::{ReportResource, REPORT_RESOURCES};
pub use collector::Collector;
pub use config::Config;
pub use orchestrator::{ClusterIndex, CycleSummary, Orchestrator};
pub use scheduler::{Scheduler, Shutdown, ShutdownHandle};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
    #[error("Failed to list {resource}: {source}")]
    List {
        resource: String,
        #[source]
        source: kubernetes::ListError,
    },
    #[error("Sink error: {0}")]
    Sink(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
