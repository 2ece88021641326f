//! Kubernetes networking resources
//!
//! Handles Services.

pub mod services;
