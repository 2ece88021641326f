//! Kubernetes types for the gateway
//!
//! Simplified, kind-tagged representations of Kubernetes resources for
//! callers. Built fresh from each list/get call and never cached.

use chrono::{DateTime, Utc};
use kubegate_common::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kubernetes version information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct K8sVersion {
    /// Major.minor version string
    pub server: String,
    pub git_version: String,
    pub git_commit: String,
    pub build_date: String,
    pub platform: String,
}

/// Fields every resource kind shares, plus the kind-specific details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub kind: ResourceKind,
    pub name: String,
    /// None for cluster-scoped kinds
    pub namespace: Option<String>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub details: ResourceDetails,
}

/// Kind-specific part of a summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceDetails {
    Deployment(DeploymentInfo),
    StatefulSet(StatefulSetInfo),
    DaemonSet(DaemonSetInfo),
    Pod(PodInfo),
    Service(ServiceInfo),
    Node(NodeInfo),
    PersistentVolume(PvInfo),
    PersistentVolumeClaim(PvcInfo),
    StorageClass(StorageClassInfo),
    Namespace(NamespaceInfo),
    Event(EventInfo),
}

/// Result of a single-object get
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDetail {
    #[serde(flatten)]
    pub summary: ResourceSummary,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Full object as returned by the API server
    pub manifest: serde_json::Value,
}

/// Raw listing from an accessor, before the query pipeline narrows it
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub items: Vec<ResourceSummary>,
    /// Unfiltered item count
    pub total: usize,
}

impl Listing {
    pub fn new(items: Vec<ResourceSummary>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// One page of a shaped listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList {
    pub items: Vec<ResourceSummary>,
    /// Items matching the filter, before pagination
    pub total: usize,
    /// Items the control plane returned, before filtering
    pub listed: usize,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub updated_replicas: i32,
    pub selector: BTreeMap<String, String>,
    pub strategy: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatefulSetInfo {
    pub replicas: i32,
    pub ready_replicas: i32,
    pub current_replicas: i32,
    pub updated_replicas: i32,
    pub selector: BTreeMap<String, String>,
    pub service_name: Option<String>,
    pub pod_management_policy: String,
    pub update_strategy: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSetInfo {
    pub desired_scheduled: i32,
    pub current_scheduled: i32,
    pub ready: i32,
    pub updated_scheduled: i32,
    pub selector: BTreeMap<String, String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodInfo {
    pub phase: String,
    pub node_name: Option<String>,
    pub pod_ip: Option<String>,
    pub restart_count: i32,
    pub containers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service_type: String,
    pub cluster_ip: Option<String>,
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePort {
    pub name: Option<String>,
    pub protocol: String,
    pub port: i32,
    pub target_port: Option<String>,
    pub node_port: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub ready: bool,
    pub unschedulable: bool,
    pub roles: Vec<String>,
    pub internal_ip: Option<String>,
    pub kubelet_version: Option<String>,
    pub architecture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvInfo {
    pub capacity: String,
    pub access_modes: Vec<String>,
    pub reclaim_policy: String,
    pub storage_class: Option<String>,
    pub volume_mode: Option<String>,
    pub claim_ref: Option<PvClaimRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvClaimRef {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvcInfo {
    pub volume_name: Option<String>,
    pub storage_class: Option<String>,
    pub access_modes: Vec<String>,
    pub capacity: Option<String>,
    pub requested_capacity: Option<String>,
    pub bound: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageClassInfo {
    pub provisioner: String,
    pub reclaim_policy: Option<String>,
    pub volume_binding_mode: Option<String>,
    pub allow_volume_expansion: bool,
    pub parameters: BTreeMap<String, String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub phase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub involved_object: InvolvedObject,
    pub count: i32,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// Object an event is about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvolvedObject {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

/// Cluster-wide object counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub node_count: usize,
    pub ready: usize,
    pub unready: usize,
    pub namespaces: usize,
    pub deployments: usize,
    pub pods: usize,
}
