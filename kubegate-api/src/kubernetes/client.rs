//! Kubernetes client wrapper
//!
//! [`ControlPlane`] is the opaque capability the rest of the core talks to:
//! list/get/delete/patch over dynamic objects. [`K8sClient`] implements it on
//! top of kube-rs; [`KubeConnector`] builds one from a stored credential.

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject};
use kube::{Client, Config};
use std::sync::Arc;
use std::time::Duration;

use super::credentials::ClusterCredential;
use super::error::{K8sError, K8sResult};
use super::types::K8sVersion;
use crate::config::RegistryConfig;

/// Remote operations against one cluster's API server
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Cluster this handle talks to
    fn cluster_id(&self) -> &str;

    /// List objects; `namespace: None` lists across all namespaces
    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> K8sResult<Vec<DynamicObject>>;

    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> K8sResult<DynamicObject>;

    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> K8sResult<()>;

    /// Apply a JSON merge patch
    async fn patch(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        patch: &serde_json::Value,
    ) -> K8sResult<()>;

    async fn server_version(&self) -> K8sResult<K8sVersion>;
}

/// Builds live clients from stored credentials
#[async_trait]
pub trait ClientConnector: Send + Sync {
    async fn connect(&self, credential: &ClusterCredential) -> K8sResult<Arc<dyn ControlPlane>>;
}

/// Wrapper around kube-rs Client with cluster context
#[derive(Clone)]
pub struct K8sClient {
    inner: Client,
    cluster_id: String,
    cluster_name: String,
    api_server: String,
}

/// Timeouts applied to every client the connector builds
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Ask the API server for its version before handing the client out
    pub verify: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            verify: true,
        }
    }
}

impl From<&RegistryConfig> for ConnectOptions {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            verify: config.verify_on_connect,
        }
    }
}

impl K8sClient {
    /// Create client from kubeconfig YAML with optional context
    pub async fn from_kubeconfig(
        kubeconfig_yaml: &str,
        context: Option<&str>,
        cluster_id: String,
        cluster_name: String,
        options: &ConnectOptions,
    ) -> K8sResult<Self> {
        let connection_failed = |message: String| K8sError::ConnectionFailed {
            cluster_id: cluster_id.clone(),
            message,
        };

        let kubeconfig = Kubeconfig::from_yaml(kubeconfig_yaml)
            .map_err(|e| connection_failed(format!("Failed to parse kubeconfig: {}", e)))?;

        let api_server =
            Self::extract_api_server(&kubeconfig, context).map_err(connection_failed)?;

        let mut config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: context.map(String::from),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| connection_failed(format!("Failed to create config: {}", e)))?;

        config.connect_timeout = Some(options.connect_timeout);
        config.read_timeout = Some(options.read_timeout);

        let client = Client::try_from(config)
            .map_err(|e| connection_failed(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            inner: client,
            cluster_id,
            cluster_name,
            api_server,
        })
    }

    /// Extract API server URL from kubeconfig
    fn extract_api_server(
        kubeconfig: &Kubeconfig,
        context_name: Option<&str>,
    ) -> Result<String, String> {
        let context_name = context_name
            .map(String::from)
            .or_else(|| kubeconfig.current_context.clone())
            .ok_or_else(|| "No context specified and no current-context".to_string())?;

        let context = kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .ok_or_else(|| format!("Context '{}' not found", context_name))?;

        let cluster_name = context
            .context
            .as_ref()
            .map(|c| c.cluster.as_str())
            .ok_or_else(|| "Context has no cluster reference".to_string())?;

        let cluster = kubeconfig
            .clusters
            .iter()
            .find(|c| c.name == cluster_name)
            .ok_or_else(|| format!("Cluster '{}' not found", cluster_name))?;

        cluster
            .cluster
            .as_ref()
            .and_then(|c| c.server.clone())
            .ok_or_else(|| "Cluster has no server URL".to_string())
    }

    pub(crate) fn api_server(&self) -> &str {
        &self.api_server
    }

    fn api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.inner.clone(), ns, resource),
            None => Api::all_with(self.inner.clone(), resource),
        }
    }

    fn map_err(
        &self,
        err: kube::Error,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> K8sError {
        K8sError::from_kube(
            err,
            &self.cluster_id,
            &resource.kind,
            name.map(|n| (namespace.unwrap_or_default(), n)),
        )
    }
}

#[async_trait]
impl ControlPlane for K8sClient {
    fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> K8sResult<Vec<DynamicObject>> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }

        let list = self
            .api(resource, namespace)
            .list(&params)
            .await
            .map_err(|e| self.map_err(e, resource, namespace, None))?;

        Ok(list.items)
    }

    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> K8sResult<DynamicObject> {
        self.api(resource, namespace)
            .get(name)
            .await
            .map_err(|e| self.map_err(e, resource, namespace, Some(name)))
    }

    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> K8sResult<()> {
        self.api(resource, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| self.map_err(e, resource, namespace, Some(name)))?;

        Ok(())
    }

    async fn patch(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        patch: &serde_json::Value,
    ) -> K8sResult<()> {
        self.api(resource, namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| self.map_err(e, resource, namespace, Some(name)))?;

        Ok(())
    }

    async fn server_version(&self) -> K8sResult<K8sVersion> {
        let version = self.inner.apiserver_version().await.map_err(|e| {
            K8sError::ConnectionFailed {
                cluster_id: self.cluster_id.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(K8sVersion {
            server: format!("{}.{}", version.major, version.minor),
            git_version: version.git_version,
            git_commit: version.git_commit,
            build_date: version.build_date,
            platform: version.platform,
        })
    }
}

impl std::fmt::Debug for K8sClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("K8sClient")
            .field("cluster_id", &self.cluster_id)
            .field("cluster_name", &self.cluster_name)
            .field("api_server", &self.api_server)
            .finish()
    }
}

/// Connector that builds kube-rs clients from kubeconfig credentials
#[derive(Debug, Clone, Default)]
pub struct KubeConnector {
    options: ConnectOptions,
}

impl KubeConnector {
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl ClientConnector for KubeConnector {
    async fn connect(&self, credential: &ClusterCredential) -> K8sResult<Arc<dyn ControlPlane>> {
        let client = K8sClient::from_kubeconfig(
            &credential.kubeconfig,
            credential.context.as_deref(),
            credential.cluster_id.clone(),
            credential.cluster_name.clone(),
            &self.options,
        )
        .await?;

        if self.options.verify {
            let version = client.server_version().await?;
            tracing::debug!(
                cluster_id = %credential.cluster_id,
                api_server = %client.api_server(),
                version = %version.git_version,
                "Verified cluster connection"
            );
        }

        Ok(Arc::new(client))
    }
}
