//! PersistentVolume and PersistentVolumeClaim operations

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use kubegate_common::{ResourceKind, ResourceQuery};

use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{
    Listing, PvClaimRef, PvInfo, PvcInfo, ResourceDetail, ResourceDetails,
};

// ============================================================================
// PersistentVolumeClaim
// ============================================================================

impl KindObject for PersistentVolumeClaim {
    const KIND: ResourceKind = ResourceKind::PersistentVolumeClaim;

    fn status(&self) -> String {
        self.status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::PersistentVolumeClaim(pvc_to_info(self))
    }
}

fn pvc_to_info(pvc: PersistentVolumeClaim) -> PvcInfo {
    let spec = pvc.spec.unwrap_or_default();
    let status = pvc.status.unwrap_or_default();

    let capacity = status
        .capacity
        .and_then(|c| c.get("storage").map(|q| q.0.clone()));

    let requested_capacity = spec
        .resources
        .and_then(|r| r.requests)
        .and_then(|r| r.get("storage").map(|q| q.0.clone()));

    PvcInfo {
        bound: status.phase.as_deref() == Some("Bound"),
        volume_name: spec.volume_name,
        storage_class: spec.storage_class_name,
        access_modes: status.access_modes.or(spec.access_modes).unwrap_or_default(),
        capacity,
        requested_capacity,
    }
}

pub struct PvcAccessor;

#[async_trait]
impl ResourceAccessor for PvcAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::PersistentVolumeClaim
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<PersistentVolumeClaim>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<PersistentVolumeClaim>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<PersistentVolumeClaim>(client, ctx, namespace, name).await
    }
}

// ============================================================================
// PersistentVolume
// ============================================================================

impl KindObject for PersistentVolume {
    const KIND: ResourceKind = ResourceKind::PersistentVolume;

    fn status(&self) -> String {
        self.status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::PersistentVolume(pv_to_info(self))
    }
}

fn pv_to_info(pv: PersistentVolume) -> PvInfo {
    let spec = pv.spec.unwrap_or_default();

    let capacity = spec
        .capacity
        .and_then(|c| c.get("storage").map(|q| q.0.clone()))
        .unwrap_or_default();

    let claim_ref = spec.claim_ref.map(|cr| PvClaimRef {
        name: cr.name.unwrap_or_default(),
        namespace: cr.namespace.unwrap_or_default(),
    });

    PvInfo {
        capacity,
        access_modes: spec.access_modes.unwrap_or_default(),
        reclaim_policy: spec
            .persistent_volume_reclaim_policy
            .unwrap_or_else(|| "Retain".to_string()),
        storage_class: spec.storage_class_name,
        volume_mode: spec.volume_mode,
        claim_ref,
    }
}

pub struct PvAccessor;

#[async_trait]
impl ResourceAccessor for PvAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::PersistentVolume
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<PersistentVolume>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<PersistentVolume>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<PersistentVolume>(client, ctx, namespace, name).await
    }
}
