//! Service operations
//!
//! List/get/delete for Services and lookup of the services exposing a
//! deployment.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kubegate_common::{ResourceKind, ResourceQuery};
use std::collections::BTreeMap;

use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{
    Listing, ResourceDetail, ResourceDetails, ResourceSummary, ServiceInfo, ServicePort,
};
use crate::kubernetes::workloads::deployments;

impl KindObject for Service {
    const KIND: ResourceKind = ResourceKind::Service;

    fn status(&self) -> String {
        let spec = self.spec.as_ref();
        let service_type = spec.and_then(|s| s.type_.as_deref()).unwrap_or("ClusterIP");

        if service_type != "LoadBalancer" {
            return "Active".to_string();
        }

        let provisioned = self
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .is_some_and(|ingress| !ingress.is_empty());

        if provisioned {
            "Active".to_string()
        } else {
            "Pending".to_string()
        }
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::Service(service_to_info(self))
    }
}

fn service_to_info(service: Service) -> ServiceInfo {
    let spec = service.spec.unwrap_or_default();

    let ports = spec
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(|p| ServicePort {
            name: p.name,
            protocol: p.protocol.unwrap_or_else(|| "TCP".to_string()),
            port: p.port,
            target_port: p.target_port.map(|tp| match tp {
                IntOrString::Int(i) => i.to_string(),
                IntOrString::String(s) => s,
            }),
            node_port: p.node_port,
        })
        .collect();

    ServiceInfo {
        service_type: spec.type_.unwrap_or_else(|| "ClusterIP".to_string()),
        cluster_ip: spec.cluster_ip,
        selector: spec.selector.unwrap_or_default(),
        ports,
    }
}

pub struct ServiceAccessor;

#[async_trait]
impl ResourceAccessor for ServiceAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<Service>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<Service>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<Service>(client, ctx, namespace, name).await
    }
}

/// Services in the deployment's namespace that route to its pods
pub async fn services_for_deployment(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
    namespace: &str,
    deployment: &str,
) -> K8sResult<Vec<ResourceSummary>> {
    let pod_labels = deployments::template_labels(client, ctx, namespace, deployment).await?;
    let services = resources::list_typed::<Service>(client, ctx, namespace, None).await?;

    Ok(services
        .into_iter()
        .filter(|svc| {
            svc.spec
                .as_ref()
                .and_then(|s| s.selector.as_ref())
                .is_some_and(|selector| selects(selector, &pod_labels))
        })
        .map(KindObject::summarize)
        .collect())
}

/// A selector matches when every key/value pair is present in `labels`.
/// An empty selector matches nothing.
fn selects(selector: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    !selector.is_empty() && selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}
