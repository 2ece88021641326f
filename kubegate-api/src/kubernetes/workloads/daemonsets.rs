//! DaemonSet operations
//!
//! DaemonSets have no replica count, so they can be restarted but not scaled.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use kubegate_common::{ResourceKind, ResourceQuery};

use super::{restart_patch, template_images};
use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{DaemonSetInfo, Listing, ResourceDetail, ResourceDetails};

impl KindObject for DaemonSet {
    const KIND: ResourceKind = ResourceKind::DaemonSet;

    fn status(&self) -> String {
        match self.status.as_ref() {
            Some(s) if s.desired_number_scheduled == 0 => "Idle".to_string(),
            Some(s) if s.number_ready >= s.desired_number_scheduled => "Running".to_string(),
            Some(_) => "Progressing".to_string(),
            None => "Unknown".to_string(),
        }
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::DaemonSet(daemonset_to_info(self))
    }
}

fn daemonset_to_info(ds: DaemonSet) -> DaemonSetInfo {
    let spec = ds.spec.unwrap_or_default();
    let status = ds.status.unwrap_or_default();

    DaemonSetInfo {
        desired_scheduled: status.desired_number_scheduled,
        current_scheduled: status.current_number_scheduled,
        ready: status.number_ready,
        updated_scheduled: status.updated_number_scheduled.unwrap_or(0),
        images: template_images(&spec.template),
        selector: spec.selector.match_labels.unwrap_or_default(),
    }
}

pub struct DaemonSetAccessor;

#[async_trait]
impl ResourceAccessor for DaemonSetAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::DaemonSet
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<DaemonSet>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<DaemonSet>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<DaemonSet>(client, ctx, namespace, name).await
    }

    async fn restart(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::patch_object::<DaemonSet>(client, ctx, namespace, name, &restart_patch())
            .await?;

        tracing::info!(namespace, name, "Restarted daemonset");
        Ok(())
    }
}
