//! StatefulSet operations

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use kubegate_common::{ResourceKind, ResourceQuery};

use super::{replica_status, restart_patch, scale_patch, template_images};
use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{Listing, ResourceDetail, ResourceDetails, StatefulSetInfo};

impl KindObject for StatefulSet {
    const KIND: ResourceKind = ResourceKind::StatefulSet;

    fn status(&self) -> String {
        let replicas = self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let ready = self
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);
        replica_status(replicas, ready)
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::StatefulSet(statefulset_to_info(self))
    }
}

fn statefulset_to_info(sts: StatefulSet) -> StatefulSetInfo {
    let spec = sts.spec.unwrap_or_default();
    let status = sts.status.unwrap_or_default();

    let update_strategy = spec
        .update_strategy
        .and_then(|s| s.type_)
        .unwrap_or_else(|| "RollingUpdate".to_string());

    let pod_management_policy = spec
        .pod_management_policy
        .unwrap_or_else(|| "OrderedReady".to_string());

    StatefulSetInfo {
        // API default when unset
        replicas: spec.replicas.unwrap_or(1),
        ready_replicas: status.ready_replicas.unwrap_or(0),
        current_replicas: status.current_replicas.unwrap_or(0),
        updated_replicas: status.updated_replicas.unwrap_or(0),
        images: template_images(&spec.template),
        selector: spec.selector.match_labels.unwrap_or_default(),
        service_name: Some(spec.service_name).filter(|s| !s.is_empty()),
        pod_management_policy,
        update_strategy,
    }
}

pub struct StatefulSetAccessor;

#[async_trait]
impl ResourceAccessor for StatefulSetAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::StatefulSet
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<StatefulSet>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<StatefulSet>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<StatefulSet>(client, ctx, namespace, name).await
    }

    async fn scale(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> K8sResult<()> {
        let patch = scale_patch(replicas)?;
        resources::patch_object::<StatefulSet>(client, ctx, namespace, name, &patch).await?;

        tracing::info!(namespace, name, replicas, "Scaled statefulset");
        Ok(())
    }

    async fn restart(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::patch_object::<StatefulSet>(client, ctx, namespace, name, &restart_patch())
            .await?;

        tracing::info!(namespace, name, "Restarted statefulset");
        Ok(())
    }
}
