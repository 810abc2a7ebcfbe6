pub mod filesystem;
pub mod s3;

pub use filesystem::FilesystemSink;
pub use s3::ObjectStoreSink;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::catalog::ReportResource;
use crate::config::Config;
use crate::metrics;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Logical name of a published document. Each sink maps it to its own layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKey {
    Report { file_name: &'static str },
    Index,
    Snapshot { timestamp: String },
}

impl DocumentKey {
    pub fn report(resource: &ReportResource) -> Self {
        DocumentKey::Report {
            file_name: resource.file_name,
        }
    }
}

#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    /// Where `key` ends up, for logging.
    fn location(&self, key: &DocumentKey) -> String;

    /// Copies a finished document from `source`, replacing any previous one.
    async fn write_file(&self, key: &DocumentKey, source: &Path) -> crate::Result<()>;

    async fn write_bytes(&self, key: &DocumentKey, bytes: Vec<u8>) -> crate::Result<()>;
}

#[derive(Debug)]
pub struct SinkFailure {
    pub sink: String,
    pub error: crate::Error,
}

/// Result of writing one document to every sink.
#[derive(Debug, Default)]
pub struct PublishOutcome {
    pub written: Vec<String>,
    pub failures: Vec<SinkFailure>,
    primary_ok: bool,
}

impl PublishOutcome {
    /// A document counts as published once the primary sink has it.
    pub fn is_success(&self) -> bool {
        self.primary_ok
    }

    pub fn into_result(self) -> crate::Result<()> {
        if self.primary_ok {
            return Ok(());
        }
        let detail = self
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.sink, f.error))
            .collect::<Vec<_>>()
            .join("; ");
        Err(crate::Error::Sink(detail))
    }
}

/// Sinks in priority order; the first one is the primary.
#[derive(Clone, Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn Sink>>,
}

impl SinkSet {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Object storage first when configured, then the local directory.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

        if let Some(store_config) = &config.object_store {
            sinks.push(Arc::new(ObjectStoreSink::from_config(
                store_config,
                &config.prefix,
                &config.cluster_name,
            )?));
        }
        if let Some(root) = &config.fs_output_dir {
            sinks.push(Arc::new(FilesystemSink::new(root, &config.cluster_name)));
        }

        if sinks.is_empty() {
            return Err(crate::Error::Config("no sink configured".to_string()));
        }
        Ok(Self::new(sinks))
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub async fn publish_file(&self, key: &DocumentKey, source: &Path) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();
        for (position, sink) in self.sinks.iter().enumerate() {
            let result = sink.write_file(key, source).await;
            record(&mut outcome, sink.as_ref(), key, position == 0, result);
        }
        outcome
    }

    pub async fn publish_bytes(&self, key: &DocumentKey, bytes: &[u8]) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();
        for (position, sink) in self.sinks.iter().enumerate() {
            let result = sink.write_bytes(key, bytes.to_vec()).await;
            record(&mut outcome, sink.as_ref(), key, position == 0, result);
        }
        outcome
    }
}

fn record(
    outcome: &mut PublishOutcome,
    sink: &dyn Sink,
    key: &DocumentKey,
    primary: bool,
    result: crate::Result<()>,
) {
    match result {
        Ok(()) => {
            debug!(sink = sink.name(), location = %sink.location(key), "Saved document");
            outcome.written.push(sink.name().to_string());
            if primary {
                outcome.primary_ok = true;
            }
        }
        Err(error) => {
            warn!(
                sink = sink.name(),
                location = %sink.location(key),
                error = %error,
                "Failed to write document"
            );
            metrics::SINK_FAILURES_TOTAL
                .with_label_values(&[sink.name()])
                .inc();
            outcome.failures.push(SinkFailure {
                sink: sink.name().to_string(),
                error,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakySink {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FlakySink {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                calls: AtomicUsize::new(0),
            })
        }

        fn result(&self) -> crate::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(crate::Error::Sink(format!("{} is down", self.name)))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Sink for FlakySink {
        fn name(&self) -> &str {
            self.name
        }

        fn location(&self, _key: &DocumentKey) -> String {
            self.name.to_string()
        }

        async fn write_file(&self, _key: &DocumentKey, _source: &Path) -> crate::Result<()> {
            self.result()
        }

        async fn write_bytes(&self, _key: &DocumentKey, _bytes: Vec<u8>) -> crate::Result<()> {
            self.result()
        }
    }

    #[tokio::test]
    async fn test_secondary_failure_keeps_publish_successful() {
        let primary = FlakySink::new("s3", false);
        let secondary = FlakySink::new("filesystem", true);
        let set = SinkSet::new(vec![primary.clone() as Arc<dyn Sink>, secondary.clone() as Arc<dyn Sink>]);

        let outcome = set.publish_bytes(&DocumentKey::Index, b"{}").await;
        assert!(outcome.is_success());
        assert_eq!(outcome.written, vec!["s3".to_string()]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].sink, "filesystem");
        assert!(outcome.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_primary_failure_still_attempts_secondary() {
        let primary = FlakySink::new("s3", true);
        let secondary = FlakySink::new("filesystem", false);
        let set = SinkSet::new(vec![primary.clone() as Arc<dyn Sink>, secondary.clone() as Arc<dyn Sink>]);

        let outcome = set
            .publish_file(
                &DocumentKey::Report {
                    file_name: "vulnerability-reports",
                },
                Path::new("/nonexistent"),
            )
            .await;
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
        assert!(!outcome.is_success());
        let err = outcome.into_result().unwrap_err();
        assert!(err.to_string().contains("s3 is down"));
    }

    #[test]
    fn test_from_config_orders_object_store_first() {
        let config = Config::from_lookup(|key| match key {
            "S3_BUCKET" => Some("reports".to_string()),
            "FS_OUTPUT_DIR" => Some("/tmp/reports".to_string()),
            _ => None,
        })
        .unwrap();
        let set = SinkSet::from_config(&config).unwrap();
        assert_eq!(set.names(), vec!["s3", "filesystem"]);
    }

    #[test]
    fn test_from_config_filesystem_only() {
        let config = Config::from_lookup(|key| match key {
            "FS_OUTPUT_DIR" => Some("/tmp/reports".to_string()),
            _ => None,
        })
        .unwrap();
        let set = SinkSet::from_config(&config).unwrap();
        assert_eq!(set.names(), vec!["filesystem"]);
    }
}
