// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Lookup façade and cache lifecycle
//!
//! [`ClientSession`] is the single entry point the interactive shell calls.
//! Queries across all namespaces (and cluster-scoped kinds) go to the live
//! fetcher; namespace-scoped queries are answered from the snapshot cache,
//! which is populated at most once per process. Every failure category is
//! absorbed here: the shell always gets a list back, possibly empty.

use std::sync::Arc;

use anyhow::Result;
use kube::config::Kubeconfig;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::cache::{CacheSnapshot, SnapshotStore};
use super::client::{KubeClient, ResourceLister};
use super::kinds::ResourceKind;
use super::NamespaceFilter;

/// Cache lifecycle, tagged explicitly instead of a process-wide flag.
/// The write lock held across Populating keeps the Uninitialized→Ready
/// transition exclusive; concurrent lookups wait rather than repopulating.
enum CacheState {
    Uninitialized,
    Populating,
    Ready(CacheSnapshot),
}

/// One shell session's view of the cluster: the live fetcher, the active
/// namespace parsed once from the kubeconfig context, and the snapshot cache.
///
/// Created once at startup; the on-disk snapshot outlives the process and is
/// reused by future sessions until the file is deleted.
pub struct ClientSession {
    lister: Arc<dyn ResourceLister>,
    store: SnapshotStore,
    namespace: Option<String>,
    cache: RwLock<CacheState>,
}

impl ClientSession {
    /// Build a session from the user's kubeconfig.
    ///
    /// A missing or unreadable kubeconfig does not prevent startup: the
    /// session starts with no client and an empty active namespace, and every
    /// lookup degrades to empty results.
    pub async fn new() -> Result<Self> {
        let kubeconfig = match Kubeconfig::read() {
            Ok(kubeconfig) => Some(kubeconfig),
            Err(e) => {
                warn!(error = %e, "unable to load kube-config");
                None
            }
        };

        let namespace = kubeconfig.as_ref().and_then(active_namespace);
        if namespace.is_none() {
            warn!("no namespace in current kubeconfig context");
        }

        let lister = Arc::new(KubeClient::new(kubeconfig).await);
        let store = SnapshotStore::new()?;

        Ok(Self::with_lister(lister, store, namespace))
    }

    /// Build a session from explicit parts. Used by tests and embedders that
    /// bring their own fetcher or snapshot location.
    pub fn with_lister(
        lister: Arc<dyn ResourceLister>,
        store: SnapshotStore,
        namespace: Option<String>,
    ) -> Self {
        Self {
            lister,
            store,
            namespace,
            cache: RwLock::new(CacheState::Uninitialized),
        }
    }

    /// The active namespace from the current kubeconfig context, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Look up resource names for the shell's completion menu.
    ///
    /// `namespace == "all"` queries the cluster live; so do cluster-scoped
    /// kinds, whose results ignore the namespace argument entirely. Any other
    /// namespace is answered from the snapshot cache for the session's active
    /// namespace, populating it on first use.
    ///
    /// Unknown resource words and every fetch failure produce an empty list;
    /// this call never errors.
    pub async fn get_resource(
        &self,
        resource: &str,
        namespace: &str,
    ) -> Vec<(String, Option<String>)> {
        let Some(kind) = ResourceKind::parse(resource) else {
            return Vec::new();
        };
        let filter = NamespaceFilter::parse(namespace);

        if filter == NamespaceFilter::All || !kind.namespaced() {
            match self.lister.fetch(kind, &filter).await {
                Ok(records) => records
                    .into_iter()
                    .map(|record| (record.name, record.namespace))
                    .collect(),
                Err(e) => {
                    warn!(kind = %kind, error = %e, "resource autocomplete disabled, query failed");
                    Vec::new()
                }
            }
        } else {
            // Cached entries all share the requested namespace by
            // construction, so no per-record namespace is attached.
            self.lookup(kind)
                .await
                .into_iter()
                .map(|name| (name, None))
                .collect()
        }
    }

    /// Cached names for `kind`, populating the cache on first use.
    /// Kinds outside the cached set yield an empty list.
    pub async fn lookup(&self, kind: ResourceKind) -> Vec<String> {
        self.ensure_cache().await;

        match &*self.cache.read().await {
            CacheState::Ready(snapshot) => snapshot.names_for(kind).to_vec(),
            _ => Vec::new(),
        }
    }

    /// Drive the cache to Ready, at most once per process.
    async fn ensure_cache(&self) {
        if matches!(&*self.cache.read().await, CacheState::Ready(_)) {
            return;
        }

        let mut state = self.cache.write().await;
        // Re-check: another task may have populated while we waited
        if matches!(&*state, CacheState::Ready(_)) {
            return;
        }
        *state = CacheState::Populating;

        if let Some(snapshot) = self.store.load() {
            debug!(path = %self.store.path().display(), "loaded resource snapshot from disk");
            *state = CacheState::Ready(snapshot);
            return;
        }

        info!(
            namespace = self.namespace.as_deref().unwrap_or_default(),
            "caching resources"
        );
        let snapshot = self.populate_live().await;

        if let Err(e) = self.store.save(&snapshot) {
            warn!(error = %e, "failed to persist resource snapshot");
        }
        *state = CacheState::Ready(snapshot);
    }

    /// Fetch every cacheable kind for the active namespace and derive the
    /// deployment list. A per-kind failure leaves that kind empty and moves
    /// on; partial success is still a usable snapshot.
    async fn populate_live(&self) -> CacheSnapshot {
        let namespace = self.namespace.clone().unwrap_or_default();
        let mut snapshot = CacheSnapshot::new();

        for kind in ResourceKind::CACHED {
            match self.lister.list_namespaced(kind, &namespace).await {
                Ok(names) => snapshot.set_names(kind, names),
                Err(e) => {
                    error!(kind = %kind, error = %e, "error getting namespaced resource");
                    snapshot.set_names(kind, Vec::new());
                }
            }
        }

        snapshot.derive_deployments();
        snapshot
    }
}

/// The namespace of the current kubeconfig context, if the context sets one.
fn active_namespace(kubeconfig: &Kubeconfig) -> Option<String> {
    let current = kubeconfig.current_context.as_deref()?;
    kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == current)
        .and_then(|c| c.context.as_ref())
        .and_then(|c| c.namespace.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::client::FetchError;
    use crate::kubernetes::ResourceRecord;
    use async_trait::async_trait;
    use kube::core::ErrorResponse;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counting fake for the cluster-query interface.
    struct FakeLister {
        /// Records returned by cross-namespace queries, keyed by kind.
        all: HashMap<ResourceKind, Vec<ResourceRecord>>,
        /// Names returned by namespaced queries, keyed by kind.
        namespaced: HashMap<ResourceKind, Vec<String>>,
        /// Kinds whose namespaced query fails with a connectivity error.
        failing: Vec<ResourceKind>,
        all_calls: AtomicUsize,
        namespaced_calls: AtomicUsize,
    }

    impl FakeLister {
        fn new() -> Self {
            Self {
                all: HashMap::new(),
                namespaced: HashMap::new(),
                failing: Vec::new(),
                all_calls: AtomicUsize::new(0),
                namespaced_calls: AtomicUsize::new(0),
            }
        }

        fn fetch_error() -> FetchError {
            FetchError::Connectivity(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "connection refused".to_string(),
                reason: "test".to_string(),
                code: 503,
            }))
        }
    }

    #[async_trait]
    impl ResourceLister for FakeLister {
        async fn list_all(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, FetchError> {
            self.all_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.all.get(&kind).cloned().unwrap_or_default())
        }

        async fn list_namespaced(
            &self,
            kind: ResourceKind,
            _namespace: &str,
        ) -> Result<Vec<String>, FetchError> {
            self.namespaced_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&kind) {
                return Err(Self::fetch_error());
            }
            Ok(self.namespaced.get(&kind).cloned().unwrap_or_default())
        }
    }

    fn record(name: &str, namespace: Option<&str>) -> ResourceRecord {
        ResourceRecord {
            name: name.to_string(),
            namespace: namespace.map(String::from),
        }
    }

    fn session_with(fake: FakeLister) -> (ClientSession, Arc<FakeLister>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::at(temp_dir.path().join("cache.json"));
        let lister = Arc::new(fake);
        let session = ClientSession::with_lister(
            Arc::clone(&lister) as Arc<dyn ResourceLister>,
            store,
            Some("dev".to_string()),
        );
        (session, lister, temp_dir)
    }

    #[tokio::test]
    async fn test_population_happens_once() {
        let mut fake = FakeLister::new();
        fake.namespaced.insert(
            ResourceKind::Pod,
            vec!["web-7d9f8c6b5-abcde".to_string()],
        );
        let (session, lister, _temp_dir) = session_with(fake);

        let first = session.lookup(ResourceKind::Pod).await;
        let second = session.lookup(ResourceKind::Pod).await;

        assert_eq!(first, vec!["web-7d9f8c6b5-abcde"]);
        assert_eq!(first, second);
        // one namespaced query per cacheable kind, and never again
        assert_eq!(lister.namespaced_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_population_writes_snapshot_file() {
        let mut fake = FakeLister::new();
        fake.namespaced
            .insert(ResourceKind::Service, vec!["web".to_string()]);
        let (session, _lister, temp_dir) = session_with(fake);

        session.lookup(ResourceKind::Service).await;

        let store = SnapshotStore::at(temp_dir.path().join("cache.json"));
        let snapshot = store.load().expect("snapshot file should exist");
        assert_eq!(snapshot.service, vec!["web"]);
    }

    #[tokio::test]
    async fn test_deployments_derived_from_pods() {
        let mut fake = FakeLister::new();
        fake.namespaced.insert(
            ResourceKind::Pod,
            vec![
                "web-7d9f8c6b5-abcde".to_string(),
                "web-7d9f8c6b5-fghij".to_string(),
                "api-55f6c9d9b-aaaaa".to_string(),
            ],
        );
        let (session, _lister, _temp_dir) = session_with(fake);

        let deployments = session.lookup(ResourceKind::Deployment).await;
        assert_eq!(deployments, vec!["api", "web"]);
    }

    #[tokio::test]
    async fn test_partial_failure_tolerated() {
        let mut fake = FakeLister::new();
        fake.namespaced
            .insert(ResourceKind::Pod, vec!["web-7d9f8c6b5-abcde".to_string()]);
        fake.failing.push(ResourceKind::Secret);
        let (session, lister, temp_dir) = session_with(fake);

        assert_eq!(
            session.lookup(ResourceKind::Pod).await,
            vec!["web-7d9f8c6b5-abcde"]
        );
        assert!(session.lookup(ResourceKind::Secret).await.is_empty());
        // all four kinds were still attempted
        assert_eq!(lister.namespaced_calls.load(Ordering::SeqCst), 4);

        // and the snapshot was still written
        let store = SnapshotStore::at(temp_dir.path().join("cache.json"));
        let snapshot = store.load().expect("snapshot file should exist");
        assert_eq!(snapshot.pod, vec!["web-7d9f8c6b5-abcde"]);
        assert!(snapshot.secret.is_empty());
    }

    #[tokio::test]
    async fn test_existing_snapshot_skips_cluster() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{"pod": ["p1-aaaa-bbbb"], "service": [], "secret": [], "configmap": []}"#,
        )
        .unwrap();

        let lister = Arc::new(FakeLister::new());
        let session = ClientSession::with_lister(
            Arc::clone(&lister) as Arc<dyn ResourceLister>,
            SnapshotStore::at(path),
            Some("dev".to_string()),
        );

        assert_eq!(session.lookup(ResourceKind::Pod).await, vec!["p1-aaaa-bbbb"]);
        // missing "deployment" key reads as an empty list
        assert!(session.lookup(ResourceKind::Deployment).await.is_empty());
        // the cluster was never queried
        assert_eq!(lister.namespaced_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_resource_all_namespaces() {
        let mut fake = FakeLister::new();
        fake.all.insert(
            ResourceKind::Pod,
            vec![
                record("web-1", Some("prod")),
                record("web-2", Some("staging")),
            ],
        );
        let (session, _lister, _temp_dir) = session_with(fake);

        let results = session.get_resource("pod", "all").await;
        assert_eq!(
            results,
            vec![
                ("web-1".to_string(), Some("prod".to_string())),
                ("web-2".to_string(), Some("staging".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_resource_namespaced_uses_cache() {
        let mut fake = FakeLister::new();
        fake.namespaced
            .insert(ResourceKind::Service, vec!["web".to_string()]);
        let (session, lister, _temp_dir) = session_with(fake);

        let results = session.get_resource("service", "dev").await;
        assert_eq!(results, vec![("web".to_string(), None)]);
        // answered from the cache path, not a live query
        assert_eq!(lister.all_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_resource_cluster_scoped_ignores_namespace() {
        let mut fake = FakeLister::new();
        fake.all.insert(
            ResourceKind::Node,
            vec![record("node-1", None), record("node-2", None)],
        );
        let (session, lister, _temp_dir) = session_with(fake);

        let results = session.get_resource("node", "prod").await;
        assert_eq!(results.len(), 2);
        // went live, not to the (node-less) cache
        assert_eq!(lister.namespaced_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_resource_unknown_kind() {
        let (session, lister, _temp_dir) = session_with(FakeLister::new());

        assert!(session.get_resource("unknownkind", "all").await.is_empty());
        assert_eq!(lister.all_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_resource_absorbs_fetch_failure() {
        struct BrokenLister;

        #[async_trait]
        impl ResourceLister for BrokenLister {
            async fn list_all(
                &self,
                _kind: ResourceKind,
            ) -> Result<Vec<ResourceRecord>, FetchError> {
                Err(FetchError::Config)
            }

            async fn list_namespaced(
                &self,
                _kind: ResourceKind,
                _namespace: &str,
            ) -> Result<Vec<String>, FetchError> {
                Err(FetchError::Config)
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let session = ClientSession::with_lister(
            Arc::new(BrokenLister),
            SnapshotStore::at(temp_dir.path().join("cache.json")),
            None,
        );

        assert!(session.get_resource("pod", "all").await.is_empty());
        // cached path: population fails per kind, yields an empty snapshot
        assert!(session.get_resource("pod", "dev").await.is_empty());
    }

    fn kubeconfig_with(current: Option<&str>, contexts: Vec<(&str, Option<&str>)>) -> Kubeconfig {
        use kube::config::{Context, NamedContext};

        Kubeconfig {
            contexts: contexts
                .into_iter()
                .map(|(name, namespace)| NamedContext {
                    name: name.to_string(),
                    context: Some(Context {
                        cluster: name.to_string(),
                        namespace: namespace.map(String::from),
                        ..Default::default()
                    }),
                })
                .collect(),
            current_context: current.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_active_namespace_from_current_context() {
        let kubeconfig = kubeconfig_with(
            Some("dev-ctx"),
            vec![("dev-ctx", Some("dev-ns")), ("other", Some("other-ns"))],
        );
        assert_eq!(active_namespace(&kubeconfig), Some("dev-ns".to_string()));
    }

    #[test]
    fn test_active_namespace_absent() {
        // current context sets no namespace
        let kubeconfig = kubeconfig_with(Some("other"), vec![("other", None)]);
        assert_eq!(active_namespace(&kubeconfig), None);

        // no current context at all
        let no_current = kubeconfig_with(None, vec![("dev-ctx", Some("dev-ns"))]);
        assert_eq!(active_namespace(&no_current), None);
    }
}
