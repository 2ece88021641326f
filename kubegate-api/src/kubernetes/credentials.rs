//! Cluster credential lookup
//!
//! The registry reads kubeconfig credentials through [`CredentialStore`].
//! Persistence lives outside the core; [`MemoryCredentialStore`] keeps them in
//! process, stamping every write with a fresh fingerprint.

use super::error::{K8sError, K8sResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stored connection material for one cluster
#[derive(Clone)]
pub struct ClusterCredential {
    pub cluster_id: String,
    pub cluster_name: String,
    /// Kubeconfig content (YAML)
    pub kubeconfig: String,
    /// Context to use from kubeconfig; current-context when absent
    pub context: Option<String>,
    /// Changes whenever the credential content changes
    pub fingerprint: String,
}

impl ClusterCredential {
    pub fn new(
        cluster_id: impl Into<String>,
        cluster_name: impl Into<String>,
        kubeconfig: impl Into<String>,
        context: Option<String>,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            cluster_name: cluster_name.into(),
            kubeconfig: kubeconfig.into(),
            context,
            fingerprint: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }
}

impl std::fmt::Debug for ClusterCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterCredential")
            .field("cluster_id", &self.cluster_id)
            .field("cluster_name", &self.cluster_name)
            .field("context", &self.context)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// Source of truth for cluster credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current credential, or `ClusterNotFound`
    async fn get_credential(&self, cluster_id: &str) -> K8sResult<ClusterCredential>;
}

/// In-process credential store
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: Arc<RwLock<HashMap<String, ClusterCredential>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the kubeconfig for a cluster, returning the new fingerprint
    pub async fn upsert(
        &self,
        cluster_id: &str,
        cluster_name: &str,
        kubeconfig: &str,
        context: Option<String>,
    ) -> String {
        let credential = ClusterCredential::new(cluster_id, cluster_name, kubeconfig, context);
        let fingerprint = credential.fingerprint.clone();

        let mut credentials = self.credentials.write().await;
        credentials.insert(cluster_id.to_string(), credential);

        tracing::info!(cluster_id, %fingerprint, "Stored cluster credential");

        fingerprint
    }

    /// Store a prebuilt credential as is
    pub async fn insert(&self, credential: ClusterCredential) {
        let mut credentials = self.credentials.write().await;
        credentials.insert(credential.cluster_id.clone(), credential);
    }

    pub async fn remove(&self, cluster_id: &str) -> K8sResult<()> {
        let mut credentials = self.credentials.write().await;
        credentials
            .remove(cluster_id)
            .map(|_| ())
            .ok_or_else(|| K8sError::ClusterNotFound(cluster_id.to_string()))
    }

    pub async fn cluster_ids(&self) -> Vec<String> {
        let credentials = self.credentials.read().await;
        let mut ids: Vec<String> = credentials.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_credential(&self, cluster_id: &str) -> K8sResult<ClusterCredential> {
        let credentials = self.credentials.read().await;
        credentials
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| K8sError::ClusterNotFound(cluster_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_rotates_fingerprint() {
        let store = MemoryCredentialStore::new();
        let v1 = store.upsert("prod", "Production", "config-v1", None).await;
        let v2 = store.upsert("prod", "Production", "config-v2", None).await;
        assert_ne!(v1, v2);

        let credential = store.get_credential("prod").await.unwrap();
        assert_eq!(credential.fingerprint, v2);
        assert_eq!(credential.kubeconfig, "config-v2");
    }

    #[tokio::test]
    async fn test_missing_cluster() {
        let store = MemoryCredentialStore::new();
        let err = store.get_credential("nope").await.unwrap_err();
        assert!(matches!(err, K8sError::ClusterNotFound(id) if id == "nope"));
        assert!(store.remove("nope").await.is_err());
    }

    #[test]
    fn test_debug_hides_kubeconfig() {
        let credential = ClusterCredential::new("c1", "dev", "token: secret", None);
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("c1"));
    }
}
