// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Fast, offline-friendly resource name lookups for interactive Kubernetes
//! shells.
//!
//! Cluster API calls are slow and may fail; a responsive prompt cannot block
//! on them for every keystroke. This crate keeps a per-namespace snapshot of
//! resource names on disk (populated at most once per cache-file lifetime)
//! and falls back to live, failure-absorbing cluster queries for
//! cross-namespace and cluster-scoped lookups.
//!
//! ```no_run
//! use kube_shell_cache::ClientSession;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let session = ClientSession::new().await?;
//! // live, across namespaces
//! let pods = session.get_resource("pod", "all").await;
//! // cached for the active namespace
//! let services = session.get_resource("service", "dev").await;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod kubernetes;
mod logging;

pub use kubernetes::{
    CacheSnapshot, ClientSession, FetchError, KubeClient, NamespaceFilter, ResourceKind,
    ResourceLister, ResourceRecord, SnapshotStore, derive_deployment_name,
};
pub use logging::init_logging;
