//! Kubernetes observability resources
//!
//! Handles Events.

pub mod events;
