use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::catalog::{ReportResource, REPORT_RESOURCES};
use crate::collector::Collector;
use crate::config::Config;
use crate::kubernetes::ReportSource;
use crate::metrics;
use crate::scheduler::Shutdown;
use crate::sinks::{DocumentKey, SinkSet};

pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Summary of the latest cycle, published at `<cluster>/index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIndex {
    pub cluster: String,
    pub last_updated: String,
    pub collection_stats: BTreeMap<String, usize>,
}

impl ClusterIndex {
    pub fn new(
        cluster: impl Into<String>,
        at: DateTime<Utc>,
        collection_stats: BTreeMap<String, usize>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            last_updated: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            collection_stats,
        }
    }
}

/// Per-cycle metadata kept when snapshots are enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    pub cluster: String,
    pub timestamp: String,
    pub collected_at: String,
    pub report_types: Vec<String>,
    pub collection_stats: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct ResourceOutcome {
    pub resource: String,
    pub result: Result<usize, String>,
}

/// What happened in one cycle; kept for the health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub started_at: String,
    pub finished_at: String,
    pub duration_seconds: f64,
    pub collection_stats: BTreeMap<String, usize>,
    pub failures: BTreeMap<String, String>,
    /// Shutdown arrived before every resource was attempted.
    pub interrupted: bool,
    pub index_published: bool,
}

pub type LastCycle = Arc<RwLock<Option<CycleSummary>>>;

/// Item counts of every resource that was collected successfully.
pub fn collection_stats(outcomes: &[ResourceOutcome]) -> BTreeMap<String, usize> {
    outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok().map(|count| (o.resource.clone(), *count)))
        .collect()
}

pub fn collection_failures(outcomes: &[ResourceOutcome]) -> BTreeMap<String, String> {
    outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err().map(|e| (o.resource.clone(), e.clone())))
        .collect()
}

pub struct Orchestrator<S> {
    cluster_name: String,
    resources: Vec<ReportResource>,
    collector: Collector<S>,
    sinks: Arc<SinkSet>,
    snapshots_enabled: bool,
    last_cycle: LastCycle,
}

impl<S: ReportSource> Orchestrator<S> {
    pub fn new(
        cluster_name: impl Into<String>,
        source: Arc<S>,
        sinks: Arc<SinkSet>,
        page_size: u32,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            resources: REPORT_RESOURCES.to_vec(),
            collector: Collector::new(source, sinks.clone(), page_size),
            sinks,
            snapshots_enabled: false,
            last_cycle: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_config(config: &Config, source: Arc<S>, sinks: Arc<SinkSet>) -> Self {
        Self::new(&config.cluster_name, source, sinks, config.page_size)
            .with_snapshots(config.snapshots_enabled)
    }

    pub fn with_resources(mut self, resources: Vec<ReportResource>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_snapshots(mut self, enabled: bool) -> Self {
        self.snapshots_enabled = enabled;
        self
    }

    pub fn last_cycle(&self) -> LastCycle {
        self.last_cycle.clone()
    }

    /// Runs one full cycle. Individual failures are logged and reflected in
    /// the summary; they never abort the cycle.
    pub async fn run_cycle(&self, shutdown: &Shutdown) -> CycleSummary {
        let started = Instant::now();
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(self.resources.len());
        let mut interrupted = false;

        for resource in &self.resources {
            if shutdown.is_requested() {
                info!("Shutdown requested, skipping remaining resources");
                interrupted = true;
                break;
            }

            info!(resource = resource.name, "Fetching {}...", resource.name);
            let result = match self.collector.collect(resource).await {
                Ok(count) => {
                    metrics::ITEMS_COLLECTED
                        .with_label_values(&[resource.name])
                        .set(count as i64);
                    Ok(count)
                }
                Err(e) => {
                    warn!(resource = resource.name, error = %e, "Failed to collect {}", resource.name);
                    metrics::RESOURCE_FAILURES_TOTAL
                        .with_label_values(&[resource.name])
                        .inc();
                    Err(e.to_string())
                }
            };
            outcomes.push(ResourceOutcome {
                resource: resource.name.to_string(),
                result,
            });
        }

        let stats = collection_stats(&outcomes);
        let failures = collection_failures(&outcomes);
        let finished_at = Utc::now();

        // A cut-short cycle would publish an index missing resources whose
        // documents are still in place from the previous cycle.
        let index_published = if interrupted {
            warn!("Cycle interrupted, keeping the previous index");
            false
        } else {
            self.publish_index(finished_at, &stats).await
        };

        if self.snapshots_enabled && !interrupted {
            self.publish_snapshot(started_at, finished_at, &stats).await;
        }

        let duration = started.elapsed();
        metrics::CYCLES_TOTAL.inc();
        metrics::LAST_CYCLE_DURATION_SECONDS.set(duration.as_secs_f64());
        metrics::LAST_CYCLE_TIMESTAMP_SECONDS.set(finished_at.timestamp());

        info!(
            duration = ?duration,
            collected = stats.len(),
            failed = failures.len(),
            stats = ?stats,
            "Collection cycle complete in {:?}",
            duration
        );

        let summary = CycleSummary {
            started_at: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            finished_at: finished_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_seconds: duration.as_secs_f64(),
            collection_stats: stats,
            failures,
            interrupted,
            index_published,
        };
        *self.last_cycle.write().await = Some(summary.clone());
        summary
    }

    async fn publish_index(&self, at: DateTime<Utc>, stats: &BTreeMap<String, usize>) -> bool {
        let index = ClusterIndex::new(&self.cluster_name, at, stats.clone());
        let body = match serde_json::to_vec_pretty(&index) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode cluster index");
                return false;
            }
        };

        let outcome = self.sinks.publish_bytes(&DocumentKey::Index, &body).await;
        if !outcome.is_success() {
            warn!("Failed to publish cluster index");
        }
        outcome.is_success()
    }

    async fn publish_snapshot(
        &self,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        stats: &BTreeMap<String, usize>,
    ) {
        let timestamp = started_at.format(SNAPSHOT_TIMESTAMP_FORMAT).to_string();
        let metadata = CollectionMetadata {
            cluster: self.cluster_name.clone(),
            timestamp: timestamp.clone(),
            collected_at: finished_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            report_types: self.resources.iter().map(|r| r.name.to_string()).collect(),
            collection_stats: stats.clone(),
        };
        let body = match serde_json::to_vec_pretty(&metadata) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode snapshot metadata");
                return;
            }
        };

        let outcome = self
            .sinks
            .publish_bytes(&DocumentKey::Snapshot { timestamp }, &body)
            .await;
        if !outcome.is_success() {
            warn!("Failed to publish snapshot metadata");
        }
    }
}
