//! Kubernetes error taxonomy
//!
//! Every failure the core reports is one of these variants. Errors coming out
//! of kube-rs are classified at the client boundary so callers never see raw
//! transport errors.

use super::batch::BatchResult;
use super::cascade::CascadeResult;
use kubegate_common::ResourceKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway errors
#[derive(Debug, Error)]
pub enum K8sError {
    /// No credential is stored for the cluster id
    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    /// Client construction or a remote call could not reach the control plane
    #[error("Connection to cluster '{cluster_id}' failed: {message}")]
    ConnectionFailed { cluster_id: String, message: String },

    /// Malformed input, never sent to the control plane
    #[error("Validation error: {0}")]
    Validation(String),

    /// Kubernetes resource not found
    #[error("Resource not found: {kind} {}", qualified(.namespace, .name))]
    ResourceNotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// The control plane rejected the request (conflict, forbidden, quota...)
    #[error("Kubernetes API rejected the request ({code} {reason}): {message}")]
    Upstream {
        code: u16,
        reason: String,
        message: String,
    },

    /// At least one batch target failed; carries every outcome
    #[error("{} of {} batch targets failed", .0.failed, .0.outcomes.len())]
    PartialBatchFailure(BatchResult),

    /// A dependent step failed after the primary step succeeded
    #[error("Cascade step failed: {}", .0.failed_step_names().join(", "))]
    CascadeStepFailure(CascadeResult),

    /// The cancellation signal fired or the deadline elapsed
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Internal system error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn qualified(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", namespace, name)
    }
}

/// Error class, for callers that need to branch on the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ClusterNotFound,
    ConnectionFailed,
    Validation,
    NotFound,
    Upstream,
    PartialBatchFailure,
    CascadeStepFailure,
    Cancelled,
    Internal,
}

/// Recorded failure of a single batch target or cascade step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub kind: ErrorKind,
    pub message: String,
}

impl K8sError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            K8sError::ClusterNotFound(_) => ErrorKind::ClusterNotFound,
            K8sError::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            K8sError::Validation(_) => ErrorKind::Validation,
            K8sError::ResourceNotFound { .. } => ErrorKind::NotFound,
            K8sError::Upstream { .. } => ErrorKind::Upstream,
            K8sError::PartialBatchFailure(_) => ErrorKind::PartialBatchFailure,
            K8sError::CascadeStepFailure(_) => ErrorKind::CascadeStepFailure,
            K8sError::Cancelled(_) => ErrorKind::Cancelled,
            K8sError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn detail(&self) -> FailureDetail {
        FailureDetail {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    pub fn not_found(kind: ResourceKind, namespace: &str, name: &str) -> Self {
        K8sError::ResourceNotFound {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn unsupported(kind: ResourceKind, operation: &str) -> Self {
        K8sError::Validation(format!("{} does not support {}", kind, operation))
    }

    /// Classify a kube-rs error raised while talking to `cluster_id`
    ///
    /// `object` names the addressed object for single-object calls; a 404 on
    /// a collection call is reported as an upstream rejection instead.
    pub fn from_kube(
        err: kube::Error,
        cluster_id: &str,
        kind: &str,
        object: Option<(&str, &str)>,
    ) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 404 => match object {
                Some((namespace, name)) => K8sError::ResourceNotFound {
                    kind: kind.to_string(),
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                },
                None => K8sError::Upstream {
                    code: resp.code,
                    reason: resp.reason,
                    message: resp.message,
                },
            },
            kube::Error::Api(resp) => K8sError::Upstream {
                code: resp.code,
                reason: resp.reason,
                message: resp.message,
            },
            kube::Error::HyperError(e) => K8sError::ConnectionFailed {
                cluster_id: cluster_id.to_string(),
                message: e.to_string(),
            },
            kube::Error::Service(e) => K8sError::ConnectionFailed {
                cluster_id: cluster_id.to_string(),
                message: e.to_string(),
            },
            other => K8sError::Internal(format!("Kubernetes error: {}", other)),
        }
    }
}

impl From<kubegate_common::Error> for K8sError {
    fn from(err: kubegate_common::Error) -> Self {
        match err {
            kubegate_common::Error::Validation(msg) => K8sError::Validation(msg),
            other => K8sError::Validation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for K8sError {
    fn from(err: serde_json::Error) -> Self {
        K8sError::Internal(format!("Failed to decode Kubernetes object: {}", err))
    }
}

/// Result type alias for Kubernetes operations
pub type K8sResult<T> = std::result::Result<T, K8sError>;
