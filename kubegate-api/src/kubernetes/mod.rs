//! Multi-cluster Kubernetes gateway core
//!
//! Provides:
//! - Cached, credential-aware client resolution per cluster
//! - Uniform list/get/delete/scale/restart across resource kinds
//! - Keyword filtering, sorting and pagination of listings
//! - Batch operations with per-target outcomes
//! - Cascading operations (deployment plus its service)
//! - Deployment rollback and node cordon/uncordon
//! - Cluster status summaries

pub mod batch;
pub mod cascade;
pub mod client;
pub mod context;
pub mod credentials;
pub mod error;
pub mod query;
pub mod registry;
pub mod resources;
pub mod types;

// Sub-modules for different resource types
pub mod cluster_resources;
pub mod config_storage;
pub mod networking;
pub mod observability;
pub mod workloads;

use kubegate_common::{BatchTarget, QueryParams, ResourceKind, ResourceQuery};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use batch::{BatchCoordinator, BatchOperation, BatchResult};
use cascade::{CascadeOrchestrator, CascadeResult, CascadeStep};
use client::{ConnectOptions, ControlPlane, KubeConnector};
use context::RequestContext;
use credentials::CredentialStore;
use error::K8sResult;
use query::QueryPipeline;
use registry::ClusterRegistry;
use resources::accessor_for;
use types::{ClusterStatus, K8sVersion, ResourceDetail, ResourceList, ResourceSummary};

/// Entry point for every cluster operation
///
/// Resolves the cluster's client through the shared registry, then dispatches
/// to the accessor for the requested kind.
pub struct KubeGateway {
    registry: Arc<ClusterRegistry>,
    batch: BatchCoordinator,
    request_timeout: Option<Duration>,
    default_page_size: usize,
    max_page_size: usize,
    idle_timeout: Duration,
}

impl KubeGateway {
    pub fn new(registry: Arc<ClusterRegistry>, config: &GatewayConfig) -> Self {
        Self {
            registry,
            batch: BatchCoordinator::new(config.batch.max_concurrency),
            request_timeout: match config.requests.timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            default_page_size: config.query.default_page_size,
            max_page_size: config.query.max_page_size,
            idle_timeout: Duration::from_secs(config.registry.idle_timeout_secs),
        }
    }

    /// Gateway talking to real clusters through kube-rs
    pub fn with_kube(store: Arc<dyn CredentialStore>, config: &GatewayConfig) -> Self {
        let connector = KubeConnector::new(ConnectOptions::from(&config.registry));
        let registry = Arc::new(ClusterRegistry::new(store, Arc::new(connector)));
        Self::new(registry, config)
    }

    pub fn registry(&self) -> &Arc<ClusterRegistry> {
        &self.registry
    }

    /// Fresh context carrying the configured request deadline
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(CancellationToken::new(), self.request_timeout)
    }

    /// Normalize raw list parameters, capping the page size
    pub fn parse_query(&self, mut params: QueryParams) -> K8sResult<ResourceQuery> {
        if params.size.is_none() {
            params.size = Some(self.default_page_size as i64);
        }
        Ok(params.into_query(self.max_page_size)?)
    }

    async fn client(&self, cluster_id: &str, ctx: &RequestContext) -> K8sResult<Arc<dyn ControlPlane>> {
        ctx.run(self.registry.get_client(cluster_id)).await
    }

    /// List one page of `kind`
    pub async fn list(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        kind: ResourceKind,
        query: &ResourceQuery,
    ) -> K8sResult<ResourceList> {
        let client = self.client(cluster_id, ctx).await?;
        let query = query.clone().clamp_page_size(self.max_page_size);

        let listing = accessor_for(kind).list(client.as_ref(), ctx, &query).await?;

        tracing::debug!(
            cluster_id,
            kind = %kind,
            listed = listing.total,
            "Listed resources"
        );

        Ok(QueryPipeline::shape(listing, &query))
    }

    pub async fn get(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        let client = self.client(cluster_id, ctx).await?;
        accessor_for(kind)
            .get(client.as_ref(), ctx, namespace, name)
            .await
    }

    pub async fn delete(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        let client = self.client(cluster_id, ctx).await?;
        accessor_for(kind)
            .delete(client.as_ref(), ctx, namespace, name)
            .await
    }

    pub async fn scale(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> K8sResult<()> {
        let client = self.client(cluster_id, ctx).await?;
        accessor_for(kind)
            .scale(client.as_ref(), ctx, namespace, name, replicas)
            .await
    }

    pub async fn restart(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        let client = self.client(cluster_id, ctx).await?;
        accessor_for(kind)
            .restart(client.as_ref(), ctx, namespace, name)
            .await
    }

    /// Cordon (`schedulable: false`) or uncordon a node
    pub async fn set_node_schedulable(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        name: &str,
        schedulable: bool,
    ) -> K8sResult<()> {
        let client = self.client(cluster_id, ctx).await?;
        accessor_for(ResourceKind::Node)
            .cordon(client.as_ref(), ctx, name, !schedulable)
            .await
    }

    /// Apply `operation` to every target of `kind`
    ///
    /// Only cluster resolution fails the call as a whole; per-target failures
    /// are in the returned result (see [`BatchResult::into_result`]).
    pub async fn batch(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        kind: ResourceKind,
        targets: Vec<BatchTarget>,
        operation: BatchOperation,
    ) -> K8sResult<BatchResult> {
        let client = self.client(cluster_id, ctx).await?;
        let client = client.as_ref();
        let accessor = accessor_for(kind);

        tracing::info!(
            cluster_id,
            kind = %kind,
            operation = operation.name(),
            targets = targets.len(),
            "Starting batch"
        );

        let result = self
            .batch
            .apply(kind, targets, move |target| async move {
                let (namespace, name) = (target.namespace.as_str(), target.name.as_str());
                match operation {
                    BatchOperation::Delete => accessor.delete(client, ctx, namespace, name).await,
                    BatchOperation::Restart => accessor.restart(client, ctx, namespace, name).await,
                    BatchOperation::Scale { replicas } => {
                        accessor.scale(client, ctx, namespace, name, replicas).await
                    }
                    BatchOperation::Cordon => accessor.cordon(client, ctx, name, true).await,
                    BatchOperation::Uncordon => accessor.cordon(client, ctx, name, false).await,
                }
            })
            .await;

        Ok(result)
    }

    /// Delete a deployment, then optionally the service exposing it
    ///
    /// The service is never touched when the deployment delete fails. A
    /// failed service delete leaves the deployment deleted.
    pub async fn delete_deployment(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
        service: Option<&str>,
    ) -> K8sResult<CascadeResult> {
        let client = self.client(cluster_id, ctx).await?;
        let client = client.as_ref();

        let primary = CascadeStep::new(
            "delete deployment",
            ResourceKind::Deployment,
            BatchTarget::new(namespace, name),
            accessor_for(ResourceKind::Deployment).delete(client, ctx, namespace, name),
        );

        let dependents = service
            .map(|svc| {
                CascadeStep::new(
                    "delete service",
                    ResourceKind::Service,
                    BatchTarget::new(namespace, svc),
                    accessor_for(ResourceKind::Service).delete(client, ctx, namespace, svc),
                )
            })
            .into_iter()
            .collect();

        Ok(CascadeOrchestrator::run(primary, dependents).await)
    }

    /// Roll back to `revision`, or the previous one; returns the restored revision
    pub async fn rollback_deployment(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
        revision: Option<i64>,
    ) -> K8sResult<i64> {
        let client = self.client(cluster_id, ctx).await?;
        workloads::deployments::rollback_deployment(client.as_ref(), ctx, namespace, name, revision)
            .await
    }

    pub async fn services_for_deployment(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<Vec<ResourceSummary>> {
        let client = self.client(cluster_id, ctx).await?;
        networking::services::services_for_deployment(client.as_ref(), ctx, namespace, name).await
    }

    pub async fn cluster_version(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
    ) -> K8sResult<K8sVersion> {
        let client = self.client(cluster_id, ctx).await?;
        ctx.run(client.server_version()).await
    }

    /// Node readiness and object counts for the whole cluster
    pub async fn cluster_status(
        &self,
        cluster_id: &str,
        ctx: &RequestContext,
    ) -> K8sResult<ClusterStatus> {
        let client = self.client(cluster_id, ctx).await?;
        cluster_resources::status::cluster_status(client.as_ref(), ctx).await
    }

    /// Drop clients idle longer than the configured idle timeout
    pub async fn reap_idle_clients(&self) -> usize {
        self.registry.reap_idle(self.idle_timeout).await
    }
}
