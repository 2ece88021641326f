//! Namespace operations

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kubegate_common::{ResourceKind, ResourceQuery};

use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{Listing, NamespaceInfo, ResourceDetail, ResourceDetails};

impl KindObject for Namespace {
    const KIND: ResourceKind = ResourceKind::Namespace;

    fn status(&self) -> String {
        if self.metadata.deletion_timestamp.is_some() {
            return "Terminating".to_string();
        }
        self.status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::Namespace(NamespaceInfo {
            phase: self.status.and_then(|s| s.phase).unwrap_or_default(),
        })
    }
}

pub struct NamespaceAccessor;

#[async_trait]
impl ResourceAccessor for NamespaceAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Namespace
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<Namespace>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<Namespace>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<Namespace>(client, ctx, namespace, name).await
    }
}
