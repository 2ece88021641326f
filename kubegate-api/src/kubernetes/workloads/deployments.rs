//! Deployment operations
//!
//! List/get/delete for Deployments plus scaling, rolling restarts and
//! rollbacks to an earlier ReplicaSet revision.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use kubegate_common::{ResourceKind, ResourceQuery};
use std::collections::BTreeMap;

use super::{replica_status, restart_patch, scale_patch, template_images};
use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::{K8sError, K8sResult};
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{DeploymentInfo, Listing, ResourceDetail, ResourceDetails};

/// ReplicaSet annotation holding the rollout revision
pub const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

const POD_TEMPLATE_HASH_LABEL: &str = "pod-template-hash";

impl KindObject for Deployment {
    const KIND: ResourceKind = ResourceKind::Deployment;

    fn status(&self) -> String {
        let replicas = self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
        let ready = self
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);

        replica_status(replicas, ready)
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::Deployment(deployment_to_info(self))
    }
}

/// Convert k8s Deployment to DeploymentInfo
fn deployment_to_info(deployment: Deployment) -> DeploymentInfo {
    let spec = deployment.spec.unwrap_or_default();
    let status = deployment.status.unwrap_or_default();

    let strategy = spec
        .strategy
        .and_then(|s| s.type_)
        .unwrap_or_else(|| "RollingUpdate".to_string());

    DeploymentInfo {
        replicas: spec.replicas.unwrap_or(0),
        ready_replicas: status.ready_replicas.unwrap_or(0),
        available_replicas: status.available_replicas.unwrap_or(0),
        updated_replicas: status.updated_replicas.unwrap_or(0),
        images: template_images(&spec.template),
        selector: spec.selector.match_labels.unwrap_or_default(),
        strategy,
    }
}

pub struct DeploymentAccessor;

#[async_trait]
impl ResourceAccessor for DeploymentAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Deployment
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<Deployment>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<Deployment>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<Deployment>(client, ctx, namespace, name).await
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
        resources::patch_object::<Deployment>(client, ctx, namespace, name, &patch).await?;

        tracing::info!(namespace, name, replicas, "Scaled deployment");
        Ok(())
    }

    async fn restart(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::patch_object::<Deployment>(client, ctx, namespace, name, &restart_patch())
            .await?;

        tracing::info!(namespace, name, "Restarted deployment");
        Ok(())
    }
}

/// Labels stamped on the deployment's pods
pub async fn template_labels(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
    namespace: &str,
    name: &str,
) -> K8sResult<BTreeMap<String, String>> {
    let deployment = resources::fetch::<Deployment>(client, ctx, namespace, name).await?;

    Ok(deployment
        .spec
        .and_then(|s| s.template.metadata)
        .and_then(|m| m.labels)
        .unwrap_or_default())
}

/// Roll a deployment back to an earlier revision
///
/// `revision: None` picks the newest revision older than the current one.
/// Returns the revision that was restored.
pub async fn rollback_deployment(
    client: &dyn ControlPlane,
    ctx: &RequestContext,
    namespace: &str,
    name: &str,
    revision: Option<i64>,
) -> K8sResult<i64> {
    let deployment = resources::fetch::<Deployment>(client, ctx, namespace, name).await?;

    let owner_uid = deployment.metadata.uid.clone();
    let selector = deployment
        .spec
        .as_ref()
        .and_then(|s| s.selector.match_labels.as_ref())
        .map(label_selector)
        .unwrap_or_default();

    if selector.is_empty() {
        return Err(K8sError::Validation(format!(
            "deployment '{}' has no label selector to find its revisions",
            name
        )));
    }

    let replicasets =
        resources::list_typed::<ReplicaSet>(client, ctx, namespace, Some(&selector)).await?;

    let mut revisions: Vec<(i64, ReplicaSet)> = replicasets
        .into_iter()
        .filter(|rs| owned_by(rs, owner_uid.as_deref()))
        .filter_map(|rs| replicaset_revision(&rs).map(|rev| (rev, rs)))
        .collect();

    // Newest first
    revisions.sort_by(|a, b| b.0.cmp(&a.0));

    let target = match revision {
        Some(rev) => revisions.iter().find(|(r, _)| *r == rev),
        None => revisions.get(1),
    };

    let (target_revision, target_rs) = target.ok_or_else(|| {
        K8sError::Validation(match revision {
            Some(rev) => format!("deployment '{}' has no revision {}", name, rev),
            None => format!("deployment '{}' has no previous revision", name),
        })
    })?;

    let mut template = target_rs
        .spec
        .as_ref()
        .and_then(|s| s.template.clone())
        .ok_or_else(|| {
            K8sError::Internal(format!(
                "revision {} of deployment '{}' has no pod template",
                target_revision, name
            ))
        })?;

    if let Some(labels) = template.metadata.as_mut().and_then(|m| m.labels.as_mut()) {
        labels.remove(POD_TEMPLATE_HASH_LABEL);
    }

    let patch = serde_json::json!({
        "spec": {
            "template": template
        }
    });

    resources::patch_object::<Deployment>(client, ctx, namespace, name, &patch).await?;

    tracing::info!(
        namespace,
        name,
        revision = *target_revision,
        "Rolled back deployment"
    );

    Ok(*target_revision)
}

fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

fn replicaset_revision(rs: &ReplicaSet) -> Option<i64> {
    rs.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(REVISION_ANNOTATION))
        .and_then(|r| r.parse::<i64>().ok())
}

/// Selector matches can include ReplicaSets of other deployments
fn owned_by(rs: &ReplicaSet, owner_uid: Option<&str>) -> bool {
    let Some(uid) = owner_uid else {
        return true;
    };
    match rs.metadata.owner_references.as_ref() {
        Some(owners) => owners.iter().any(|o| o.uid == uid),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

    fn deployment(replicas: i32, ready: i32) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                ready_replicas: Some(ready),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_status_text() {
        assert_eq!(deployment(0, 0).status(), "Stopped");
        assert_eq!(deployment(3, 3).status(), "Running");
        assert_eq!(deployment(3, 1).status(), "Progressing");
    }

    #[test]
    fn test_summary_defaults() {
        let summary = deployment(2, 2).summarize();
        assert_eq!(summary.name, "web");
        assert_eq!(summary.namespace.as_deref(), Some("default"));
        match summary.details {
            ResourceDetails::Deployment(info) => {
                assert_eq!(info.replicas, 2);
                assert_eq!(info.strategy, "RollingUpdate");
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_label_selector_is_sorted() {
        let labels = BTreeMap::from([
            ("tier".to_string(), "web".to_string()),
            ("app".to_string(), "shop".to_string()),
        ]);
        assert_eq!(label_selector(&labels), "app=shop,tier=web");
    }

    #[test]
    fn test_owned_by() {
        let rs = ReplicaSet {
            metadata: ObjectMeta {
                owner_references: Some(vec![OwnerReference {
                    uid: "abc".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(owned_by(&rs, Some("abc")));
        assert!(!owned_by(&rs, Some("xyz")));
        assert!(owned_by(&rs, None));
    }
}
