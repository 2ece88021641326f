//! StorageClass operations

use async_trait::async_trait;
use k8s_openapi::api::storage::v1::StorageClass;
use kubegate_common::{ResourceKind, ResourceQuery};

use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{Listing, ResourceDetail, ResourceDetails, StorageClassInfo};

pub const DEFAULT_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";

fn is_default(sc: &StorageClass) -> bool {
    sc.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(DEFAULT_CLASS_ANNOTATION))
        .is_some_and(|v| v == "true")
}

impl KindObject for StorageClass {
    const KIND: ResourceKind = ResourceKind::StorageClass;

    fn status(&self) -> String {
        if is_default(self) {
            "Default".to_string()
        } else {
            "Active".to_string()
        }
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::StorageClass(storageclass_to_info(self))
    }
}

fn storageclass_to_info(sc: StorageClass) -> StorageClassInfo {
    StorageClassInfo {
        is_default: is_default(&sc),
        provisioner: sc.provisioner,
        reclaim_policy: sc.reclaim_policy,
        volume_binding_mode: sc.volume_binding_mode,
        allow_volume_expansion: sc.allow_volume_expansion.unwrap_or(false),
        parameters: sc.parameters.unwrap_or_default(),
    }
}

pub struct StorageClassAccessor;

#[async_trait]
impl ResourceAccessor for StorageClassAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::StorageClass
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<StorageClass>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<StorageClass>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<StorageClass>(client, ctx, namespace, name).await
    }
}
