//! Read access to the report custom resources on the control plane.

mod client;

pub use client::KubeReportSource;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::ReportResource;

#[derive(Debug, Error)]
pub enum ListError {
    /// The API server does not serve this resource type (CRD not installed).
    #[error("resource type is not served by the API server")]
    NotFound,
    #[error("Kubernetes API error: {0}")]
    Kube(kube::Error),
    #[error("{0}")]
    Other(String),
}

impl ListError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ListError::NotFound)
    }
}

impl From<kube::Error> for ListError {
    fn from(err: kube::Error) -> Self {
        let not_found = match &err {
            kube::Error::Api(response) => response.code == 404,
            other => other
                .to_string()
                .contains("could not find the requested resource"),
        };
        if not_found {
            ListError::NotFound
        } else {
            ListError::Kube(err)
        }
    }
}

/// One page of a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPage<T> {
    pub items: Vec<T>,
    /// `None` once the server has no more pages.
    pub continue_token: Option<String>,
}

impl<T> ReportPage<T> {
    pub fn new(items: Vec<T>, continue_token: Option<String>) -> Self {
        Self {
            items,
            continue_token: continue_token.filter(|token| !token.is_empty()),
        }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Paged list access to report resources. Items are opaque documents and
/// are only ever serialized back out.
#[cfg_attr(test, mockall::automock(type Item = serde_json::Value;))]
#[async_trait]
pub trait ReportSource: Send + Sync {
    type Item: Serialize + Send + Sync;

    async fn list_page(
        &self,
        resource: &ReportResource,
        limit: u32,
        continue_token: Option<String>,
    ) -> Result<ReportPage<Self::Item>, ListError>;
}
