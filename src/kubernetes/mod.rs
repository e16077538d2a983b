mod cache;
mod client;
mod deployment;
mod kinds;
mod session;

pub use cache::{CacheSnapshot, SnapshotStore};
pub use client::{FetchError, KubeClient, ResourceLister};
pub use deployment::derive_deployment_name;
pub use kinds::ResourceKind;
pub use session::ClientSession;

/// One live item returned by a cluster list query.
///
/// Transient: only derived name lists are ever persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    /// Absent for cluster-scoped kinds.
    pub namespace: Option<String>,
}

/// Namespace scope for a lookup; `"all"` is the no-filter sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceFilter {
    All,
    Name(String),
}

impl NamespaceFilter {
    pub fn parse(namespace: &str) -> Self {
        if namespace == "all" {
            Self::All
        } else {
            Self::Name(namespace.to_string())
        }
    }

    /// Exact, case-sensitive namespace equality. Only meaningful for
    /// namespace-scoped kinds; cluster-scoped records bypass filtering.
    pub fn matches(&self, record: &ResourceRecord) -> bool {
        match self {
            Self::All => true,
            Self::Name(ns) => record.namespace.as_deref() == Some(ns.as_str()),
        }
    }
}
