//! Cluster status summary
//!
//! Node readiness plus namespace, deployment and pod counts, taken from one
//! concurrent round of cluster-wide listings.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};

use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources;
use crate::kubernetes::types::{ClusterStatus, ResourceDetails};

pub(crate) async fn cluster_status(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
) -> K8sResult<ClusterStatus> {
    let (nodes, namespaces, deployments, pods) = futures::try_join!(
        resources::list_summaries::<Node>(client, ctx, &[]),
        resources::list_summaries::<Namespace>(client, ctx, &[]),
        resources::list_summaries::<Deployment>(client, ctx, &[]),
        resources::list_summaries::<Pod>(client, ctx, &[]),
    )?;

    let ready = nodes
        .items
        .iter()
        .filter(|n| matches!(&n.details, ResourceDetails::Node(info) if info.ready))
        .count();

    let status = ClusterStatus {
        node_count: nodes.total,
        ready,
        unready: nodes.total - ready,
        namespaces: namespaces.total,
        deployments: deployments.total,
        pods: pods.total,
    };

    tracing::debug!(
        cluster_id = client.cluster_id(),
        nodes = status.node_count,
        ready = status.ready,
        pods = status.pods,
        "Collected cluster status"
    );

    Ok(status)
}
