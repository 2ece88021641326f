//! Node operations
//!
//! List/get/delete nodes and toggle schedulability (cordon/uncordon).

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kubegate_common::{ResourceKind, ResourceQuery};

use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{Listing, NodeInfo, ResourceDetail, ResourceDetails};

const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

fn is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

fn is_unschedulable(node: &Node) -> bool {
    node.spec
        .as_ref()
        .and_then(|s| s.unschedulable)
        .unwrap_or(false)
}

impl KindObject for Node {
    const KIND: ResourceKind = ResourceKind::Node;

    fn status(&self) -> String {
        let mut status = if is_ready(self) { "Ready" } else { "NotReady" }.to_string();
        if is_unschedulable(self) {
            status.push_str(",SchedulingDisabled");
        }
        status
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::Node(node_to_info(self))
    }
}

fn node_to_info(node: Node) -> NodeInfo {
    let ready = is_ready(&node);
    let unschedulable = is_unschedulable(&node);

    let roles = node
        .metadata
        .labels
        .as_ref()
        .map(|labels| {
            labels
                .keys()
                .filter_map(|k| k.strip_prefix(ROLE_LABEL_PREFIX))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let status = node.status.unwrap_or_default();

    let internal_ip = status
        .addresses
        .unwrap_or_default()
        .into_iter()
        .find(|a| a.type_ == "InternalIP")
        .map(|a| a.address);

    let system = status.node_info;

    NodeInfo {
        ready,
        unschedulable,
        roles,
        internal_ip,
        kubelet_version: system.as_ref().map(|i| i.kubelet_version.clone()),
        architecture: system.map(|i| i.architecture),
    }
}

pub struct NodeAccessor;

#[async_trait]
impl ResourceAccessor for NodeAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Node
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<Node>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<Node>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<Node>(client, ctx, namespace, name).await
    }

    async fn cordon(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        name: &str,
        unschedulable: bool,
    ) -> K8sResult<()> {
        let patch = serde_json::json!({
            "spec": {
                "unschedulable": unschedulable
            }
        });

        resources::patch_object::<Node>(client, ctx, "", name, &patch).await?;

        if unschedulable {
            tracing::info!(node = name, "Cordoned node");
        } else {
            tracing::info!(node = name, "Uncordoned node");
        }
        Ok(())
    }
}
