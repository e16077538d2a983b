use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{DynamicObject, ListParams, ObjectList};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use thiserror::Error;
use tracing::{debug, warn};

use super::kinds::ResourceKind;
use super::{NamespaceFilter, ResourceRecord};

/// Timeout for connecting to the K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (doubles each retry)
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Page size for paginated list requests
const PAGE_SIZE: u32 = 500;

/// Why a live cluster query could not produce results.
///
/// Callers decide what to do with each category; nothing here is fatal.
/// The lookup façade absorbs all three into empty results plus a warning.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No usable kubeconfig was found at startup, so no client exists.
    #[error("no cluster client available")]
    Config,
    /// The cluster received the request and rejected it (authorization or
    /// other API-level failure).
    #[error("cluster rejected the request: {0}")]
    Auth(#[source] kube::Error),
    /// The cluster could not be reached: transport errors, timeouts, or
    /// retries exhausted.
    #[error("unable to connect to the cluster: {0}")]
    Connectivity(#[source] kube::Error),
}

/// The narrow cluster-query interface the cache populator and the lookup
/// façade depend on. Implemented by [`KubeClient`] for live clusters and by
/// fakes in tests.
#[async_trait]
pub trait ResourceLister: Send + Sync {
    /// List every item of `kind` across all namespaces. Live queries are never
    /// pre-filtered server-side; namespace filtering happens in [`fetch`].
    ///
    /// [`fetch`]: ResourceLister::fetch
    async fn list_all(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, FetchError>;

    /// List the names of `kind` within one namespace. Restricted to the
    /// cacheable kinds; any other kind yields an empty list rather than an
    /// error.
    async fn list_namespaced(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<String>, FetchError>;

    /// Fetch `kind` under a namespace filter.
    ///
    /// Namespace-scoped kinds are listed across all namespaces and filtered
    /// client-side by exact equality; cluster-scoped kinds ignore the filter
    /// entirely and always return every item.
    async fn fetch(
        &self,
        kind: ResourceKind,
        filter: &NamespaceFilter,
    ) -> Result<Vec<ResourceRecord>, FetchError> {
        let records = self.list_all(kind).await?;
        if !kind.namespaced() {
            return Ok(records);
        }
        Ok(records.into_iter().filter(|r| filter.matches(r)).collect())
    }
}

/// Live resource fetcher backed by the kube client.
///
/// Construction never fails: without a usable kubeconfig the client is simply
/// absent and every query reports [`FetchError::Config`], which degrades
/// autocompletion to "no suggestions" instead of crashing the shell.
pub struct KubeClient {
    client: Option<Client>,
}

impl KubeClient {
    /// Build a client from an already-read kubeconfig. `None` (kubeconfig
    /// missing or unreadable) produces a client-less fetcher.
    pub async fn new(kubeconfig: Option<Kubeconfig>) -> Self {
        let client = match kubeconfig {
            Some(kubeconfig) => match Self::build_client(kubeconfig).await {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "unable to create cluster client, live queries disabled");
                    None
                }
            },
            None => None,
        };
        Self { client }
    }

    /// Read the kubeconfig (honoring `$KUBECONFIG`) and build a client.
    /// Load failure is a warning, never an error.
    pub async fn from_kubeconfig() -> Self {
        let kubeconfig = match Kubeconfig::read() {
            Ok(kubeconfig) => Some(kubeconfig),
            Err(e) => {
                warn!(error = %e, "unable to load kube-config");
                None
            }
        };
        Self::new(kubeconfig).await
    }

    async fn build_client(kubeconfig: Kubeconfig) -> Result<Client> {
        let mut config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("failed to load kubeconfig")?;

        // Timeouts for reliability; a hanging API server should not hang the
        // shell past these.
        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);

        Client::try_from(config).context("failed to create cluster client")
    }

    fn client(&self) -> Result<Client, FetchError> {
        self.client.clone().ok_or(FetchError::Config)
    }

    /// List all pages of a dynamic API, following continue tokens.
    async fn list_paged(
        api: &Api<DynamicObject>,
        kind: ResourceKind,
    ) -> Result<Vec<DynamicObject>, FetchError> {
        let mut items = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut params = ListParams::default().limit(PAGE_SIZE);
            if let Some(token) = &continue_token {
                params = params.continue_token(token);
            }

            let list = Self::list_page_with_retry(api, &params, kind).await?;
            items.extend(list.items);

            match list.metadata.continue_ {
                Some(token) if !token.is_empty() => {
                    debug!(kind = %kind, total_so_far = items.len(), "fetched page, continuing");
                    continue_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(items)
    }

    /// Fetch a single page, retrying transient failures with backoff.
    async fn list_page_with_retry(
        api: &Api<DynamicObject>,
        params: &ListParams,
        kind: ResourceKind,
    ) -> Result<ObjectList<DynamicObject>, FetchError> {
        let mut attempt = 0;
        loop {
            match api.list(params).await {
                Ok(list) => return Ok(list),
                Err(e) if is_retryable_error(&e) && attempt + 1 < MAX_RETRIES => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    warn!(
                        kind = %kind,
                        attempt = attempt + 1,
                        max_attempts = MAX_RETRIES,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retryable error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                // Retries exhausted count as a connectivity failure
                Err(e) if is_retryable_error(&e) => return Err(FetchError::Connectivity(e)),
                Err(e) => return Err(classify_error(e)),
            }
        }
    }
}

#[async_trait]
impl ResourceLister for KubeClient {
    async fn list_all(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, FetchError> {
        let client = self.client()?;
        let ar = kind.api_resource();
        let api: Api<DynamicObject> = Api::all_with(client, &ar);

        let items = Self::list_paged(&api, kind).await?;
        debug!(kind = %kind, items = items.len(), "listed resources across namespaces");

        Ok(items
            .into_iter()
            .map(|item| ResourceRecord {
                name: item.metadata.name.unwrap_or_default(),
                namespace: item.metadata.namespace,
            })
            .collect())
    }

    async fn list_namespaced(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<String>, FetchError> {
        if !ResourceKind::CACHED.contains(&kind) {
            return Ok(Vec::new());
        }

        let client = self.client()?;
        let ar = kind.api_resource();
        let api: Api<DynamicObject> = Api::namespaced_with(client, namespace, &ar);

        let items = Self::list_paged(&api, kind).await?;
        debug!(kind = %kind, namespace = %namespace, items = items.len(), "listed namespaced resources");

        Ok(items
            .into_iter()
            .filter_map(|item| item.metadata.name)
            .collect())
    }
}

/// Sort a query failure into the error taxonomy: API-level rejections are one
/// category, everything else is a connectivity problem.
fn classify_error(err: kube::Error) -> FetchError {
    match err {
        kube::Error::Api(_) => FetchError::Auth(err),
        _ => FetchError::Connectivity(err),
    }
}

/// Check if an error is a transient failure worth retrying
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        // Network/connection errors are retryable
        kube::Error::HyperError(_) => true,
        // API errors: retry on 429 (rate limit), 503 (unavailable), 504 (timeout)
        kube::Error::Api(api_err) => matches!(api_err.code, 429 | 503 | 504),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: "test".to_string(),
            code,
        })
    }

    #[test]
    fn test_retryable_api_codes() {
        assert!(is_retryable_error(&api_error(429)));
        assert!(is_retryable_error(&api_error(503)));
        assert!(is_retryable_error(&api_error(504)));
        assert!(!is_retryable_error(&api_error(401)));
        assert!(!is_retryable_error(&api_error(403)));
        assert!(!is_retryable_error(&api_error(404)));
    }

    #[test]
    fn test_classify_api_error_as_auth() {
        assert!(matches!(
            classify_error(api_error(403)),
            FetchError::Auth(_)
        ));
    }

    #[tokio::test]
    async fn test_clientless_fetcher_reports_config_error() {
        let client = KubeClient::new(None).await;
        let result = client.list_all(ResourceKind::Pod).await;
        assert!(matches!(result, Err(FetchError::Config)));

        let result = client.list_namespaced(ResourceKind::Pod, "dev").await;
        assert!(matches!(result, Err(FetchError::Config)));
    }

    #[tokio::test]
    async fn test_list_namespaced_rejects_uncached_kinds_quietly() {
        // Even without a client, non-cacheable kinds short-circuit to empty.
        let client = KubeClient::new(None).await;
        let names = client
            .list_namespaced(ResourceKind::Node, "dev")
            .await
            .unwrap();
        assert!(names.is_empty());
    }

    // Trait-level fetch semantics, exercised through a fake lister.
    struct FakeLister {
        records: Vec<ResourceRecord>,
    }

    #[async_trait]
    impl ResourceLister for FakeLister {
        async fn list_all(&self, _kind: ResourceKind) -> Result<Vec<ResourceRecord>, FetchError> {
            Ok(self.records.clone())
        }

        async fn list_namespaced(
            &self,
            _kind: ResourceKind,
            _namespace: &str,
        ) -> Result<Vec<String>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn record(name: &str, namespace: Option<&str>) -> ResourceRecord {
        ResourceRecord {
            name: name.to_string(),
            namespace: namespace.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_fetch_all_spans_namespaces() {
        let lister = FakeLister {
            records: vec![
                record("web-1", Some("prod")),
                record("web-2", Some("staging")),
            ],
        };

        let records = lister
            .fetch(ResourceKind::Pod, &NamespaceFilter::All)
            .await
            .unwrap();
        let namespaces: Vec<_> = records.iter().filter_map(|r| r.namespace.clone()).collect();
        assert_eq!(namespaces, vec!["prod", "staging"]);
    }

    #[tokio::test]
    async fn test_fetch_filters_namespaced_kinds_client_side() {
        let lister = FakeLister {
            records: vec![
                record("web-1", Some("prod")),
                record("web-2", Some("staging")),
                record("web-3", Some("Prod")),
            ],
        };

        let records = lister
            .fetch(
                ResourceKind::Pod,
                &NamespaceFilter::Name("prod".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(records, vec![record("web-1", Some("prod"))]);
    }

    #[tokio::test]
    async fn test_fetch_ignores_filter_for_cluster_scoped_kinds() {
        let lister = FakeLister {
            records: vec![record("node-1", None), record("node-2", None)],
        };

        let records = lister
            .fetch(
                ResourceKind::Node,
                &NamespaceFilter::Name("prod".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }
}
