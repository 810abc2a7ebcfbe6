use async_trait::async_trait;
use kube::{
    api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams},
    Client,
};
use tracing::debug;

use super::{ListError, ReportPage, ReportSource};
use crate::catalog::ReportResource;

/// Lists report resources across all namespaces through the dynamic API.
#[derive(Clone)]
pub struct KubeReportSource {
    client: Client,
}

impl KubeReportSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn try_default() -> crate::Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn api_for(&self, resource: &ReportResource) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(resource.group(), resource.version(), resource.kind);
        let api_resource = ApiResource::from_gvk_with_plural(&gvk, resource.name);
        Api::all_with(self.client.clone(), &api_resource)
    }
}

#[async_trait]
impl ReportSource for KubeReportSource {
    type Item = DynamicObject;

    async fn list_page(
        &self,
        resource: &ReportResource,
        limit: u32,
        continue_token: Option<String>,
    ) -> Result<ReportPage<DynamicObject>, ListError> {
        let mut params = ListParams::default().limit(limit);
        if let Some(token) = continue_token.as_deref() {
            params = params.continue_token(token);
        }

        let list = self.api_for(resource).list(&params).await?;
        debug!(
            resource = resource.name,
            items = list.items.len(),
            "Listed page"
        );

        Ok(ReportPage::new(list.items, list.metadata.continue_))
    }
}
