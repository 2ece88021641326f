//! Uniform per-kind resource access
//!
//! Every resource kind implements [`ResourceAccessor`]; the gateway, the query
//! pipeline and the batch coordinator only ever see the trait. The typed
//! helpers below do the dynamic-object plumbing once for all kinds.

use async_trait::async_trait;
use futures::future::try_join_all;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::{ApiResource, DynamicObject, TypeMeta};
use kube::Resource;
use kubegate_common::{BatchTarget, ResourceKind, ResourceQuery};
use serde::de::DeserializeOwned;

use super::client::ControlPlane;
use super::cluster_resources::namespaces::NamespaceAccessor;
use super::cluster_resources::nodes::NodeAccessor;
use super::config_storage::pvcs::{PvAccessor, PvcAccessor};
use super::config_storage::storageclasses::StorageClassAccessor;
use super::context::RequestContext;
use super::error::{K8sError, K8sResult};
use super::networking::services::ServiceAccessor;
use super::observability::events::EventAccessor;
use super::types::{Listing, ResourceDetail, ResourceDetails, ResourceSummary};
use super::workloads::daemonsets::DaemonSetAccessor;
use super::workloads::deployments::DeploymentAccessor;
use super::workloads::pods::PodAccessor;
use super::workloads::statefulsets::StatefulSetAccessor;

/// List/Get/Delete/Scale/Restart for one resource kind
///
/// Capabilities a kind lacks fail with a validation error before anything
/// is sent to the cluster.
#[async_trait]
pub trait ResourceAccessor: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Objects in `query.namespaces()` (all namespaces when empty)
    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing>;

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail>;

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()>;

    /// Set the desired replica count
    async fn scale(
        &self,
        _client: &dyn ControlPlane,
        _ctx: &RequestContext,
        _namespace: &str,
        _name: &str,
        _replicas: i32,
    ) -> K8sResult<()> {
        Err(K8sError::unsupported(self.kind(), "scale"))
    }

    /// Trigger a rolling restart of the pod template
    async fn restart(
        &self,
        _client: &dyn ControlPlane,
        _ctx: &RequestContext,
        _namespace: &str,
        _name: &str,
    ) -> K8sResult<()> {
        Err(K8sError::unsupported(self.kind(), "restart"))
    }

    /// Mark a node (un)schedulable
    async fn cordon(
        &self,
        _client: &dyn ControlPlane,
        _ctx: &RequestContext,
        _name: &str,
        _unschedulable: bool,
    ) -> K8sResult<()> {
        Err(K8sError::unsupported(self.kind(), "cordon"))
    }
}

static DEPLOYMENTS: DeploymentAccessor = DeploymentAccessor;
static STATEFULSETS: StatefulSetAccessor = StatefulSetAccessor;
static DAEMONSETS: DaemonSetAccessor = DaemonSetAccessor;
static PODS: PodAccessor = PodAccessor;
static SERVICES: ServiceAccessor = ServiceAccessor;
static NODES: NodeAccessor = NodeAccessor;
static PVS: PvAccessor = PvAccessor;
static PVCS: PvcAccessor = PvcAccessor;
static STORAGE_CLASSES: StorageClassAccessor = StorageClassAccessor;
static NAMESPACES: NamespaceAccessor = NamespaceAccessor;
static EVENTS: EventAccessor = EventAccessor;

/// Accessor implementing `kind`
pub fn accessor_for(kind: ResourceKind) -> &'static dyn ResourceAccessor {
    match kind {
        ResourceKind::Deployment => &DEPLOYMENTS,
        ResourceKind::StatefulSet => &STATEFULSETS,
        ResourceKind::DaemonSet => &DAEMONSETS,
        ResourceKind::Pod => &PODS,
        ResourceKind::Service => &SERVICES,
        ResourceKind::Node => &NODES,
        ResourceKind::PersistentVolume => &PVS,
        ResourceKind::PersistentVolumeClaim => &PVCS,
        ResourceKind::StorageClass => &STORAGE_CLASSES,
        ResourceKind::Namespace => &NAMESPACES,
        ResourceKind::Event => &EVENTS,
    }
}

/// Typed Kubernetes object that can be shown as a [`ResourceSummary`]
pub(crate) trait KindObject: Resource<DynamicType = ()> + DeserializeOwned + Send {
    const KIND: ResourceKind;

    /// Status column text
    fn status(&self) -> String;

    fn details(self) -> ResourceDetails;

    fn summarize(self) -> ResourceSummary
    where
        Self: Sized,
    {
        let meta: ObjectMeta = self.meta().clone();
        let status = self.status();
        let details = self.details();

        ResourceSummary {
            kind: Self::KIND,
            name: meta.name.unwrap_or_default(),
            namespace: if Self::KIND.is_namespaced() {
                meta.namespace
            } else {
                None
            },
            status,
            created_at: meta.creation_timestamp.map(|t| t.0),
            labels: meta.labels.unwrap_or_default(),
            details,
        }
    }
}

pub(crate) fn api_resource<K: KindObject>() -> ApiResource {
    ApiResource::erase::<K>(&())
}

/// Reject malformed addresses before they reach the cluster
pub(crate) fn validate_target(kind: ResourceKind, namespace: &str, name: &str) -> K8sResult<()> {
    BatchTarget::new(namespace, name).validate(kind)?;
    Ok(())
}

fn scope(kind: ResourceKind, namespace: &str) -> Option<&str> {
    if kind.is_namespaced() {
        Some(namespace)
    } else {
        None
    }
}

/// Parse a dynamic object into its typed form
///
/// List responses omit `apiVersion`/`kind` on items; fill them in from the
/// resource so typed deserialization accepts the object.
pub(crate) fn decode<K: DeserializeOwned>(
    mut obj: DynamicObject,
    resource: &ApiResource,
) -> K8sResult<K> {
    if obj.types.is_none() {
        obj.types = Some(TypeMeta {
            api_version: resource.api_version.clone(),
            kind: resource.kind.clone(),
        });
    }
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

/// List `K` across the given namespaces and summarize each object
pub(crate) async fn list_summaries<K: KindObject>(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
    namespaces: &[String],
) -> K8sResult<Listing> {
    let resource = api_resource::<K>();

    let objects = if namespaces.is_empty() || !K::KIND.is_namespaced() {
        ctx.run(client.list(&resource, None, None)).await?
    } else {
        let per_namespace = try_join_all(
            namespaces
                .iter()
                .map(|ns| ctx.run(client.list(&resource, Some(ns.as_str()), None))),
        )
        .await?;
        per_namespace.into_iter().flatten().collect()
    };

    let items = objects
        .into_iter()
        .map(|obj| decode::<K>(obj, &resource).map(KindObject::summarize))
        .collect::<K8sResult<Vec<_>>>()?;

    Ok(Listing::new(items))
}

/// Fetch a single `K` with its annotations and full manifest
pub(crate) async fn get_detail<K: KindObject>(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
    namespace: &str,
    name: &str,
) -> K8sResult<ResourceDetail> {
    validate_target(K::KIND, namespace, name)?;
    let resource = api_resource::<K>();

    let obj = ctx
        .run(client.get(&resource, scope(K::KIND, namespace), name))
        .await?;

    let manifest = serde_json::to_value(&obj)?;
    let annotations = obj.metadata.annotations.clone().unwrap_or_default();
    let summary = decode::<K>(obj, &resource)?.summarize();

    Ok(ResourceDetail {
        summary,
        annotations,
        manifest,
    })
}

pub(crate) async fn delete_object<K: KindObject>(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
    namespace: &str,
    name: &str,
) -> K8sResult<()> {
    validate_target(K::KIND, namespace, name)?;
    let resource = api_resource::<K>();

    ctx.run(client.delete(&resource, scope(K::KIND, namespace), name))
        .await?;

    tracing::info!(kind = %K::KIND, namespace, name, "Deleted resource");
    Ok(())
}

/// Merge-patch a `K`
pub(crate) async fn patch_object<K: KindObject>(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
    namespace: &str,
    name: &str,
    patch: &serde_json::Value,
) -> K8sResult<()> {
    validate_target(K::KIND, namespace, name)?;
    let resource = api_resource::<K>();

    ctx.run(client.patch(&resource, scope(K::KIND, namespace), name, patch))
        .await
}

/// Fetch a single `K` in typed form
pub(crate) async fn fetch<K: KindObject>(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
    namespace: &str,
    name: &str,
) -> K8sResult<K> {
    validate_target(K::KIND, namespace, name)?;
    let resource = api_resource::<K>();

    let obj = ctx
        .run(client.get(&resource, scope(K::KIND, namespace), name))
        .await?;
    decode(obj, &resource)
}

/// List any typed object in one namespace, optionally by label selector
pub(crate) async fn list_typed<K>(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
    namespace: &str,
    label_selector: Option<&str>,
) -> K8sResult<Vec<K>>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    let resource = ApiResource::erase::<K>(&());

    ctx.run(client.list(&resource, Some(namespace), label_selector))
        .await?
        .into_iter()
        .map(|obj| decode(obj, &resource))
        .collect()
}
