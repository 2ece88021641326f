//! Kubernetes cluster-scoped resources
//!
//! Handles Nodes, Namespaces and the cluster status summary.

pub mod namespaces;
pub mod nodes;
pub(crate) mod status;
