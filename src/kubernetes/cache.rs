// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! On-disk snapshot of cached resource names
//!
//! One JSON file holds the resource names for exactly one namespace, keyed by
//! kind name. The snapshot is written once after live population and reused by
//! every later process until the file is deleted; staleness across restarts is
//! an accepted tradeoff for startup latency.
//!
//! Snapshot location: ~/.kube/kube_shell/cache.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::deployment::derive_deployment_name;
use super::kinds::ResourceKind;
use crate::config;

/// Current snapshot format version. Older files without the field read as 0
/// and are still accepted; the keyed-list-of-strings shape is stable.
const SNAPSHOT_VERSION: u32 = 1;

/// Atomically write content to a file using tempfile + rename
///
/// Creates a temporary file in the same directory, writes content, then
/// atomically renames it to the final path, so a concurrently starting
/// process sees either the old snapshot or the new one, never a partial write.
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use tempfile::NamedTempFile;

    let temp_file = NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))
        .context("Failed to create temp file")?;

    std::fs::write(temp_file.path(), content)
        .with_context(|| format!("Failed to write temp file {:?}", temp_file.path()))?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to persist file to {:?}", path))?;

    Ok(())
}

/// Cached resource names for one namespace.
///
/// Serializes to a single object keyed by kind name, each value an array of
/// name strings. Every key is optional on read: a missing key means an empty
/// list, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub service: Vec<String>,
    #[serde(default)]
    pub pod: Vec<String>,
    #[serde(default)]
    pub secret: Vec<String>,
    #[serde(default)]
    pub configmap: Vec<String>,
    #[serde(default)]
    pub deployment: Vec<String>,
}

impl CacheSnapshot {
    pub fn new() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            ..Self::default()
        }
    }

    /// The cached names for `kind`; empty for kinds that are not cached.
    pub fn names_for(&self, kind: ResourceKind) -> &[String] {
        match kind {
            ResourceKind::Service => &self.service,
            ResourceKind::Pod => &self.pod,
            ResourceKind::Secret => &self.secret,
            ResourceKind::ConfigMap => &self.configmap,
            ResourceKind::Deployment => &self.deployment,
            _ => &[],
        }
    }

    /// Store the fetched names for one of the cacheable kinds.
    /// Other kinds are ignored; their names are never persisted.
    pub fn set_names(&mut self, kind: ResourceKind, names: Vec<String>) {
        match kind {
            ResourceKind::Service => self.service = names,
            ResourceKind::Pod => self.pod = names,
            ResourceKind::Secret => self.secret = names,
            ResourceKind::ConfigMap => self.configmap = names,
            ResourceKind::Deployment => self.deployment = names,
            _ => {}
        }
    }

    /// Rebuild the deployment name list from the pod list: the deriver applied
    /// to every pod name, deduplicated, in stable sorted order.
    pub fn derive_deployments(&mut self) {
        let unique: BTreeSet<String> = self.pod.iter().map(|p| derive_deployment_name(p)).collect();
        self.deployment = unique.into_iter().collect();
    }
}

/// Persistence for the cache snapshot file.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Store at the default location (~/.kube/kube_shell/cache.json)
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: config::cache_file()?,
        })
    }

    /// Store at an explicit path. Used for tests and embedding.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot if the file exists and parses.
    ///
    /// A corrupt or unreadable file is treated the same as a missing one, so
    /// the caller falls back to live population and overwrites it.
    pub fn load(&self) -> Option<CacheSnapshot> {
        if !self.path.exists() {
            return None;
        }

        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable snapshot file");
                None
            }
        }
    }

    /// Write the snapshot, creating the cache directory if missing.
    pub fn save(&self, snapshot: &CacheSnapshot) -> Result<()> {
        let content =
            serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory {:?}", parent)
            })?;
        }

        atomic_write(&self.path, content.as_bytes()).context("Failed to write snapshot")?;

        Ok(())
    }

    /// Delete the snapshot file, forcing a fresh live population on the next
    /// process start.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
