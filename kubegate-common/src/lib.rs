//! Common types shared between kubegate-api and its callers
//!
//! Everything here is plain data: resource kinds, list queries and batch
//! targets as they arrive from a caller-facing layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Page size used when a caller asks for zero or a negative page size
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Errors raised while interpreting caller input
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("Invalid sort specification: {0}")]
    InvalidSort(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Resource kinds reachable through the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    Pod,
    Service,
    Node,
    PersistentVolume,
    PersistentVolumeClaim,
    StorageClass,
    Namespace,
    Event,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 11] = [
        ResourceKind::Deployment,
        ResourceKind::StatefulSet,
        ResourceKind::DaemonSet,
        ResourceKind::Pod,
        ResourceKind::Service,
        ResourceKind::Node,
        ResourceKind::PersistentVolume,
        ResourceKind::PersistentVolumeClaim,
        ResourceKind::StorageClass,
        ResourceKind::Namespace,
        ResourceKind::Event,
    ];

    /// Kubernetes `kind` string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::Pod => "Pod",
            Self::Service => "Service",
            Self::Node => "Node",
            Self::PersistentVolume => "PersistentVolume",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::StorageClass => "StorageClass",
            Self::Namespace => "Namespace",
            Self::Event => "Event",
        }
    }

    /// Whether names of this kind are scoped by a namespace
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            Self::Node | Self::PersistentVolume | Self::StorageClass | Self::Namespace
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "deployment" | "deployments" | "deploy" => Self::Deployment,
            "statefulset" | "statefulsets" | "sts" => Self::StatefulSet,
            "daemonset" | "daemonsets" | "ds" => Self::DaemonSet,
            "pod" | "pods" | "po" => Self::Pod,
            "service" | "services" | "svc" => Self::Service,
            "node" | "nodes" | "no" => Self::Node,
            "persistentvolume" | "persistentvolumes" | "pv" => Self::PersistentVolume,
            "persistentvolumeclaim" | "persistentvolumeclaims" | "pvc" => {
                Self::PersistentVolumeClaim
            }
            "storageclass" | "storageclasses" | "sc" => Self::StorageClass,
            "namespace" | "namespaces" | "ns" => Self::Namespace,
            "event" | "events" | "ev" => Self::Event,
            _ => return Err(Error::UnknownKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// Property a listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    Namespace,
    CreationTimestamp,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort key plus direction
///
/// Parses from the dashboard form `"<a|d>,<property>"`, e.g.
/// `"d,creationTimestamp"` for newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortBy {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Descending,
        }
    }
}

impl Default for SortBy {
    fn default() -> Self {
        Self::descending(SortKey::CreationTimestamp)
    }
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (direction, property) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidSort(s.to_string()))?;

        let direction = match direction.trim() {
            "a" | "asc" => SortDirection::Ascending,
            "d" | "desc" => SortDirection::Descending,
            _ => return Err(Error::InvalidSort(s.to_string())),
        };

        let key = match property.trim() {
            "name" => SortKey::Name,
            "namespace" => SortKey::Namespace,
            "creationTimestamp" | "createdAt" | "age" => SortKey::CreationTimestamp,
            "status" => SortKey::Status,
            _ => return Err(Error::InvalidSort(s.to_string())),
        };

        Ok(Self { key, direction })
    }
}

/// Normalized list query
///
/// Invariants: `page_size >= 1`; `page` counts from zero. Built per request
/// and never mutated in place; the `with_*` methods return a new query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceQuery {
    namespaces: Vec<String>,
    keyword: Option<String>,
    page: usize,
    page_size: usize,
    sort: SortBy,
}

impl Default for ResourceQuery {
    fn default() -> Self {
        Self {
            namespaces: Vec::new(),
            keyword: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortBy::default(),
        }
    }
}

impl ResourceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given namespaces; blanks and duplicates are dropped
    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for ns in namespaces {
            let ns = ns.as_ref().trim();
            if !ns.is_empty() && !cleaned.iter().any(|n| n == ns) {
                cleaned.push(ns.to_string());
            }
        }
        self.namespaces = cleaned;
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        let keyword = keyword.trim();
        self.keyword = if keyword.is_empty() {
            None
        } else {
            Some(keyword.to_string())
        };
        self
    }

    /// Set the page window; negative pages become 0, non-positive sizes the default
    pub fn with_page(mut self, page: i64, page_size: i64) -> Self {
        self.page = usize::try_from(page).unwrap_or(0);
        self.page_size = match usize::try_from(page_size) {
            Ok(0) | Err(_) => DEFAULT_PAGE_SIZE,
            Ok(size) => size,
        };
        self
    }

    pub fn with_sort(mut self, sort: SortBy) -> Self {
        self.sort = sort;
        self
    }

    /// Cap the page size at `max` (itself at least 1)
    pub fn clamp_page_size(mut self, max: usize) -> Self {
        self.page_size = self.page_size.min(max.max(1));
        self
    }

    /// Empty means all namespaces
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn sort(&self) -> SortBy {
        self.sort
    }
}

/// Raw list parameters as a caller-facing layer receives them
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    /// Comma-separated namespaces, empty for all
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default, rename = "sortBy")]
    pub sort_by: Option<String>,
}

impl QueryParams {
    /// Build a normalized query, capping the page size at `max_page_size`
    pub fn into_query(self, max_page_size: usize) -> Result<ResourceQuery> {
        let sort = match self.sort_by.as_deref().map(str::trim) {
            Some(spec) if !spec.is_empty() => spec.parse()?,
            _ => SortBy::default(),
        };

        let namespaces: Vec<String> = self
            .namespace
            .as_deref()
            .map(|ns| ns.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        Ok(ResourceQuery::new()
            .with_namespaces(namespaces)
            .with_keyword(self.keyword.unwrap_or_default())
            .with_page(self.page.unwrap_or(0), self.size.unwrap_or(0))
            .with_sort(sort)
            .clamp_page_size(max_page_size))
    }
}

/// One named object a batch or cascade step acts on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchTarget {
    /// Empty for cluster-scoped kinds
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

impl BatchTarget {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Target for a cluster-scoped object
    pub fn cluster(name: impl Into<String>) -> Self {
        Self::new(String::new(), name)
    }

    /// Check the target carries what `kind` needs to address an object
    pub fn validate(&self, kind: ResourceKind) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(format!("{} name is required", kind)));
        }
        if kind.is_namespaced() && self.namespace.trim().is_empty() {
            return Err(Error::Validation(format!(
                "namespace is required for {} '{}'",
                kind, self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_aliases() {
        assert_eq!("deploy".parse::<ResourceKind>().unwrap(), ResourceKind::Deployment);
        assert_eq!("PVC".parse::<ResourceKind>().unwrap(), ResourceKind::PersistentVolumeClaim);
        assert_eq!("sc".parse::<ResourceKind>().unwrap(), ResourceKind::StorageClass);
        assert_eq!("ns".parse::<ResourceKind>().unwrap(), ResourceKind::Namespace);
        assert_eq!("events".parse::<ResourceKind>().unwrap(), ResourceKind::Event);
        assert!("ingress".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_kind_scope() {
        assert!(ResourceKind::Deployment.is_namespaced());
        assert!(ResourceKind::PersistentVolumeClaim.is_namespaced());
        assert!(!ResourceKind::PersistentVolume.is_namespaced());
        assert!(!ResourceKind::Node.is_namespaced());
        assert!(!ResourceKind::Namespace.is_namespaced());
        assert!(ResourceKind::Event.is_namespaced());
    }

    #[test]
    fn test_sort_spec_parsing() {
        let sort: SortBy = "d,creationTimestamp".parse().unwrap();
        assert_eq!(sort, SortBy::descending(SortKey::CreationTimestamp));

        let sort: SortBy = "a,name".parse().unwrap();
        assert_eq!(sort, SortBy::ascending(SortKey::Name));

        assert!("x,name".parse::<SortBy>().is_err());
        assert!("a,replicas".parse::<SortBy>().is_err());
        assert!("name".parse::<SortBy>().is_err());
    }

    #[test]
    fn test_query_normalization() {
        let query = ResourceQuery::new().with_page(-3, 0);
        assert_eq!(query.page(), 0);
        assert_eq!(query.page_size(), DEFAULT_PAGE_SIZE);

        let query = ResourceQuery::new().with_page(2, -5);
        assert_eq!(query.page(), 2);
        assert_eq!(query.page_size(), DEFAULT_PAGE_SIZE);

        let query = ResourceQuery::new().with_page(0, 5000).clamp_page_size(100);
        assert_eq!(query.page_size(), 100);
    }

    #[test]
    fn test_query_params_namespaces() {
        let params = QueryParams {
            namespace: Some("default, kube-system,,default".to_string()),
            keyword: Some("  ".to_string()),
            page: Some(1),
            size: Some(20),
            sort_by: Some("a,name".to_string()),
        };

        let query = params.into_query(100).unwrap();
        assert_eq!(query.namespaces(), ["default", "kube-system"]);
        assert_eq!(query.keyword(), None);
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), 20);
        assert_eq!(query.sort(), SortBy::ascending(SortKey::Name));
    }

    #[test]
    fn test_query_params_from_json() {
        let params: QueryParams =
            serde_json::from_str(r#"{"namespace":"","keyword":"web","sortBy":"d,name"}"#)
                .unwrap();
        let query = params.into_query(50).unwrap();
        assert!(query.namespaces().is_empty());
        assert_eq!(query.keyword(), Some("web"));
        assert_eq!(query.sort(), SortBy::descending(SortKey::Name));
    }

    #[test]
    fn test_batch_target_validation() {
        assert!(BatchTarget::new("default", "web").validate(ResourceKind::Deployment).is_ok());
        assert!(BatchTarget::new("", "web").validate(ResourceKind::Deployment).is_err());
        assert!(BatchTarget::new("default", " ").validate(ResourceKind::Deployment).is_err());
        assert!(BatchTarget::cluster("node-1").validate(ResourceKind::Node).is_ok());
    }

    #[test]
    fn test_batch_target_serialization() {
        let target: BatchTarget = serde_json::from_str(r#"{"name":"pv-1"}"#).unwrap();
        assert_eq!(target, BatchTarget::cluster("pv-1"));
        assert_eq!(BatchTarget::new("ns", "app").to_string(), "ns/app");
    }
}
