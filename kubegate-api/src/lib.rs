//! Kubegate API Library
//!
//! Multi-cluster Kubernetes access core: client registry, uniform resource
//! operations, batch and cascade orchestration, plus the ambient config,
//! logging and error-response layers.

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Cluster access
pub mod kubernetes;

pub use config::GatewayConfig;
pub use error::{ApiError, ErrorResponse};
pub use kubernetes::KubeGateway;
