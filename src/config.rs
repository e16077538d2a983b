// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! On-disk locations for kube-shell-cache
//!
//! All state lives under ~/.kube/kube_shell/:
//! - ~/.kube/kube_shell/cache.json - the resource name snapshot
//! - ~/.kube/kube_shell/log/ - rolling log files
//!
//! The kubeconfig itself is located by the kube crate, honoring $KUBECONFIG.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the base application directory (~/.kube/kube_shell/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kube").join("kube_shell"))
        .context("Could not determine home directory")
}

/// Get the snapshot file path (~/.kube/kube_shell/cache.json)
pub fn cache_file() -> Result<PathBuf> {
    Ok(base_dir()?.join("cache.json"))
}

/// Get the log directory (~/.kube/kube_shell/log/)
pub fn log_dir() -> Result<PathBuf> {
    Ok(base_dir()?.join("log"))
}
