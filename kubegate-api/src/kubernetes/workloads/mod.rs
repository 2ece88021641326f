//! Kubernetes workload management
//!
//! Handles Deployments, StatefulSets, DaemonSets and Pods.

pub mod daemonsets;
pub mod deployments;
pub mod pods;
pub mod statefulsets;

use super::error::{K8sError, K8sResult};
use k8s_openapi::api::core::v1::PodTemplateSpec;

/// Pod template annotation bumped to trigger a rolling restart
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// Merge patch setting `spec.replicas`
pub(crate) fn scale_patch(replicas: i32) -> K8sResult<serde_json::Value> {
    if replicas < 0 {
        return Err(K8sError::Validation(format!(
            "replicas must be >= 0, got {}",
            replicas
        )));
    }

    Ok(serde_json::json!({
        "spec": {
            "replicas": replicas
        }
    }))
}

/// Merge patch stamping the pod template with the current time
pub(crate) fn restart_patch() -> serde_json::Value {
    let now = chrono::Utc::now().to_rfc3339();
    serde_json::json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": {
                        RESTARTED_AT_ANNOTATION: now
                    }
                }
            }
        }
    })
}

/// Status text for a replicated workload
pub(crate) fn replica_status(desired: i32, ready: i32) -> String {
    if desired == 0 {
        "Stopped".to_string()
    } else if ready >= desired {
        "Running".to_string()
    } else {
        "Progressing".to_string()
    }
}

/// Container images of a pod template, in declaration order
pub(crate) fn template_images(template: &PodTemplateSpec) -> Vec<String> {
    template
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .filter_map(|c| c.image.clone())
                .collect()
        })
        .unwrap_or_default()
}
