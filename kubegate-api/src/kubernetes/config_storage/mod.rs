//! Kubernetes storage resources
//!
//! Handles PVCs, PVs, and StorageClasses.

pub mod pvcs;
pub mod storageclasses;
