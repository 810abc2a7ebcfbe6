//! Paged collection of one report resource into a single JSON document.
//!
//! Items are streamed page by page into a scratch file so that only one page
//! is ever held in memory. The finished file is then handed to every sink.

use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

use crate::catalog::ReportResource;
use crate::kubernetes::{ListError, ReportSource};
use crate::metrics;
use crate::sinks::{DocumentKey, SinkSet};
use crate::{Error, Result};

const ITEM_SEPARATOR: &[u8] = b",\n";
const DOCUMENT_FOOTER: &[u8] = b"\n  ]\n}\n";

pub struct Collector<S> {
    source: Arc<S>,
    sinks: Arc<SinkSet>,
    page_size: u32,
}

impl<S: ReportSource> Collector<S> {
    pub fn new(source: Arc<S>, sinks: Arc<SinkSet>, page_size: u32) -> Self {
        Self {
            source,
            sinks,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Collects every item of `resource` and publishes the document.
    ///
    /// Returns the number of items written. A resource type the cluster does
    /// not serve yields `Ok(0)` and nothing is published.
    pub async fn collect(&self, resource: &ReportResource) -> Result<usize> {
        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}-", resource.file_name))
            .suffix(".json")
            .tempfile()?;

        let count = match self.write_document(resource, &scratch).await? {
            Some(count) => count,
            None => {
                info!(
                    resource = resource.name,
                    "Resource not found in cluster (CRD missing?)"
                );
                return Ok(0);
            }
        };
        info!(resource = resource.name, count, "Found {} {}", count, resource.name);

        self.sinks
            .publish_file(&DocumentKey::report(resource), scratch.path())
            .await
            .into_result()?;

        Ok(count)
    }

    /// Streams all pages into `scratch`. `None` means the resource type is
    /// unknown to the API server.
    async fn write_document(
        &self,
        resource: &ReportResource,
        scratch: &NamedTempFile,
    ) -> Result<Option<usize>> {
        let file = tokio::fs::File::from_std(scratch.reopen()?);
        let mut out = BufWriter::new(file);
        out.write_all(document_header(resource)?.as_bytes()).await?;

        let mut continue_token: Option<String> = None;
        let mut first_page = true;
        let mut count = 0usize;

        loop {
            let page = match self
                .source
                .list_page(resource, self.page_size, continue_token.take())
                .await
            {
                Ok(page) => page,
                Err(ListError::NotFound) if first_page => return Ok(None),
                Err(source) => {
                    return Err(Error::List {
                        resource: resource.name.to_string(),
                        source,
                    })
                }
            };
            first_page = false;

            for item in &page.items {
                let encoded = match serde_json::to_vec(item) {
                    Ok(encoded) => encoded,
                    Err(e) => {
                        warn!(resource = resource.name, error = %e, "Failed to encode item, skipping");
                        metrics::SKIPPED_ITEMS_TOTAL
                            .with_label_values(&[resource.name])
                            .inc();
                        continue;
                    }
                };
                if count > 0 {
                    out.write_all(ITEM_SEPARATOR).await?;
                }
                out.write_all(&encoded).await?;
                count += 1;
            }

            match page.continue_token {
                Some(token) => continue_token = Some(token),
                None => break,
            }
        }

        out.write_all(DOCUMENT_FOOTER).await?;
        out.flush().await?;
        out.into_inner().sync_all().await?;

        Ok(Some(count))
    }
}

fn document_header(resource: &ReportResource) -> Result<String> {
    Ok(format!(
        "{{\n  \"apiVersion\": {},\n  \"items\": [\n",
        serde_json::to_string(&resource.api_version())?
    ))
}
