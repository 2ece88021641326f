//! Cluster client registry
//!
//! Resolves a cluster id into a live [`ControlPlane`] handle, building clients
//! lazily from the credential store and caching one client per cluster.
//! A cached client is only handed out while its fingerprint matches the
//! credential currently stored for that cluster.
//!
//! Locking: the outer map holds one slot per cluster id and is write-locked
//! only to create or drop a slot. Replacing a cached client locks just that
//! cluster's slot. Client construction runs with no lock held.

use super::client::{ClientConnector, ControlPlane};
use super::credentials::{ClusterCredential, CredentialStore};
use super::error::{K8sError, K8sResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A live client plus the credential fingerprint it was built from
pub struct CachedClient {
    cluster_id: String,
    client: Arc<dyn ControlPlane>,
    fingerprint: String,
    /// Unix millis of the last hand-out
    last_used: AtomicI64,
}

impl CachedClient {
    fn new(cluster_id: &str, client: Arc<dyn ControlPlane>, fingerprint: &str) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            client,
            fingerprint: fingerprint.to_string(),
            last_used: AtomicI64::new(now_millis()),
        }
    }

    fn touch(&self) {
        self.last_used.store(now_millis(), Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let idle = now_millis() - self.last_used.load(Ordering::Relaxed);
        Duration::from_millis(idle.max(0) as u64)
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Default)]
struct ClientSlot {
    entry: RwLock<Option<Arc<CachedClient>>>,
}

/// Registry of cluster clients, shared by every request
pub struct ClusterRegistry {
    store: Arc<dyn CredentialStore>,
    connector: Arc<dyn ClientConnector>,
    slots: RwLock<HashMap<String, Arc<ClientSlot>>>,
}

impl ClusterRegistry {
    pub fn new(store: Arc<dyn CredentialStore>, connector: Arc<dyn ClientConnector>) -> Self {
        Self {
            store,
            connector,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Get a client for the cluster, building one if none is cached or the
    /// cached one was built from an outdated credential.
    pub async fn get_client(&self, cluster_id: &str) -> K8sResult<Arc<dyn ControlPlane>> {
        let credential = match self.store.get_credential(cluster_id).await {
            Ok(credential) => credential,
            Err(err @ K8sError::ClusterNotFound(_)) => {
                self.invalidate(cluster_id).await;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if let Some(cached) = self.lookup(cluster_id).await {
            if cached.fingerprint == credential.fingerprint {
                cached.touch();
                debug!(cluster_id, "Client cache hit");
                return Ok(cached.client.clone());
            }
        }

        self.build_and_store(&credential).await
    }

    async fn build_and_store(
        &self,
        credential: &ClusterCredential,
    ) -> K8sResult<Arc<dyn ControlPlane>> {
        let cluster_id = credential.cluster_id.as_str();
        let start = Instant::now();

        let client = match self.connector.connect(credential).await {
            Ok(client) => client,
            Err(err) => {
                warn!(cluster_id, error = %err, "Failed to build cluster client");
                self.evict_stale(cluster_id).await;
                return Err(err);
            }
        };

        // The credential may have rotated while we were connecting
        let current = self.current_fingerprint(cluster_id).await;
        if current.as_deref() != Some(credential.fingerprint.as_str()) {
            debug!(
                cluster_id,
                fingerprint = %credential.fingerprint,
                "Credential changed during construction, not caching client"
            );
            return Ok(client);
        }

        let slot = self.slot(cluster_id).await;
        let mut entry = slot.entry.write().await;

        if let Some(existing) = entry.as_ref() {
            if existing.fingerprint == credential.fingerprint {
                // Another task finished first with the same credential
                existing.touch();
                return Ok(existing.client.clone());
            }
            info!(
                cluster_id,
                old_fingerprint = %existing.fingerprint,
                new_fingerprint = %credential.fingerprint,
                "Evicting client built from outdated credential"
            );
        }

        *entry = Some(Arc::new(CachedClient::new(
            cluster_id,
            client.clone(),
            &credential.fingerprint,
        )));

        info!(
            cluster_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Cluster client ready"
        );

        Ok(client)
    }

    /// Fingerprint of the credential stored right now, if any
    async fn current_fingerprint(&self, cluster_id: &str) -> Option<String> {
        self.store
            .get_credential(cluster_id)
            .await
            .ok()
            .map(|c| c.fingerprint)
    }

    async fn lookup(&self, cluster_id: &str) -> Option<Arc<CachedClient>> {
        let slot = {
            let slots = self.slots.read().await;
            slots.get(cluster_id).cloned()
        }?;
        let entry = slot.entry.read().await;
        entry.clone()
    }

    async fn slot(&self, cluster_id: &str) -> Arc<ClientSlot> {
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(cluster_id) {
                return slot.clone();
            }
        }

        let mut slots = self.slots.write().await;
        slots.entry(cluster_id.to_string()).or_default().clone()
    }

    /// Drop the cached client unless it matches the stored credential
    async fn evict_stale(&self, cluster_id: &str) {
        let slot = {
            let slots = self.slots.read().await;
            slots.get(cluster_id).cloned()
        };
        let Some(slot) = slot else {
            return;
        };

        let current = self.current_fingerprint(cluster_id).await;
        let mut entry = slot.entry.write().await;
        if entry
            .as_ref()
            .is_some_and(|e| current.as_deref() != Some(e.fingerprint.as_str()))
        {
            debug!(cluster_id, "Evicted client built from outdated credential");
            *entry = None;
        }
    }

    /// Drop the cached client for a cluster, if any
    pub async fn invalidate(&self, cluster_id: &str) -> bool {
        let mut slots = self.slots.write().await;
        let removed = slots.remove(cluster_id).is_some();
        if removed {
            info!(cluster_id, "Invalidated cluster client");
        }
        removed
    }

    /// Drop clients nobody has used for longer than `max_idle`
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let slots: Vec<(String, Arc<ClientSlot>)> = {
            let slots = self.slots.read().await;
            slots.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let mut reaped = 0;
        for (cluster_id, slot) in slots {
            let mut entry = slot.entry.write().await;
            if entry.as_ref().is_some_and(|e| e.idle_for() > max_idle) {
                *entry = None;
                reaped += 1;
                debug!(cluster_id = %cluster_id, "Reaped idle cluster client");
            }
        }

        if reaped > 0 {
            info!(reaped, "Reaped idle cluster clients");
        }
        reaped
    }

    /// Ids of clusters that currently have a cached client
    pub async fn cached_clusters(&self) -> Vec<String> {
        let slots: Vec<(String, Arc<ClientSlot>)> = {
            let slots = self.slots.read().await;
            slots.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let mut ids = Vec::new();
        for (cluster_id, slot) in slots {
            if slot.entry.read().await.is_some() {
                ids.push(cluster_id);
            }
        }
        ids.sort();
        ids
    }
}
