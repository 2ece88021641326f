//! Pod operations

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kubegate_common::{ResourceKind, ResourceQuery};

use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{Listing, PodInfo, ResourceDetail, ResourceDetails};

impl KindObject for Pod {
    const KIND: ResourceKind = ResourceKind::Pod;

    fn status(&self) -> String {
        if self.metadata.deletion_timestamp.is_some() {
            return "Terminating".to_string();
        }

        let status = match self.status.as_ref() {
            Some(status) => status,
            None => return "Unknown".to_string(),
        };

        // A waiting container reason (CrashLoopBackOff, ImagePullBackOff...)
        // says more than the phase
        let waiting = status
            .container_statuses
            .iter()
            .flatten()
            .filter_map(|cs| cs.state.as_ref()?.waiting.as_ref()?.reason.clone())
            .next();

        waiting
            .or_else(|| status.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::Pod(pod_to_info(self))
    }
}

fn pod_to_info(pod: Pod) -> PodInfo {
    let spec = pod.spec.unwrap_or_default();
    let status = pod.status.unwrap_or_default();

    let restart_count = status
        .container_statuses
        .iter()
        .flatten()
        .map(|cs| cs.restart_count)
        .sum();

    PodInfo {
        phase: status.phase.unwrap_or_else(|| "Unknown".to_string()),
        node_name: spec.node_name,
        pod_ip: status.pod_ip,
        restart_count,
        containers: spec.containers.into_iter().map(|c| c.name).collect(),
    }
}

pub struct PodAccessor;

#[async_trait]
impl ResourceAccessor for PodAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Pod
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<Pod>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<Pod>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<Pod>(client, ctx, namespace, name).await
    }
}
