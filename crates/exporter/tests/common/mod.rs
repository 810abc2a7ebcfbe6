#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use report_exporter::catalog::ReportResource;
use report_exporter::kubernetes::{ListError, ReportPage, ReportSource};
use serde_json::{json, Value};

pub const VULNS: ReportResource =
    ReportResource::new("vulnerabilityreports", "VulnerabilityReport", "vulnerability-reports");
pub const SECRETS: ReportResource =
    ReportResource::new("exposedsecretreports", "ExposedSecretReport", "exposed-secret-reports");
pub const AUDITS: ReportResource =
    ReportResource::new("configauditreports", "ConfigAuditReport", "config-audit-reports");

#[derive(Debug, Clone, PartialEq)]
pub struct ListCall {
    pub resource: String,
    pub limit: u32,
    pub continue_token: Option<String>,
}

/// In-memory control plane. Continue tokens are offsets into the item list.
#[derive(Default)]
pub struct FakeCluster {
    resources: HashMap<String, Vec<Value>>,
    broken: HashMap<String, String>,
    calls: Mutex<Vec<ListCall>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, resource: &ReportResource, count: usize) -> Self {
        let items = (0..count)
            .map(|i| {
                json!({
                    "apiVersion": "aquasecurity.github.io/v1alpha1",
                    "kind": resource.kind,
                    "metadata": { "name": format!("{}-{}", resource.name, i), "namespace": "default" },
                    "report": { "summary": { "criticalCount": i } }
                })
            })
            .collect();
        self.resources.insert(resource.name.to_string(), items);
        self
    }

    pub fn with_failure(mut self, resource: &ReportResource, message: &str) -> Self {
        self.broken
            .insert(resource.name.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ListCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, resource: &ReportResource) -> Vec<ListCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.resource == resource.name)
            .collect()
    }
}

#[async_trait]
impl ReportSource for FakeCluster {
    type Item = Value;

    async fn list_page(
        &self,
        resource: &ReportResource,
        limit: u32,
        continue_token: Option<String>,
    ) -> Result<ReportPage<Value>, ListError> {
        self.calls.lock().unwrap().push(ListCall {
            resource: resource.name.to_string(),
            limit,
            continue_token: continue_token.clone(),
        });

        if let Some(message) = self.broken.get(resource.name) {
            return Err(ListError::Other(message.clone()));
        }
        let items = self.resources.get(resource.name).ok_or(ListError::NotFound)?;

        let start: usize = continue_token
            .as_deref()
            .map(|t| t.parse().expect("token is an offset"))
            .unwrap_or(0);
        let end = (start + limit as usize).min(items.len());
        let next = (end < items.len()).then(|| end.to_string());

        Ok(ReportPage::new(items[start..end].to_vec(), next))
    }
}
