// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Deployment name derivation from pod names
//!
//! Pods created through a Deployment are named `<deployment>-<replicaset-hash>-<pod-hash>`,
//! so the owning deployment name can be recovered without an extra API call by
//! stripping the last two hyphen-delimited segments.

/// Derive the owning deployment name from a pod name.
///
/// Strips the last two hyphen-delimited segments and rejoins the rest.
/// A pod name with fewer than three segments yields an empty string: there is
/// nothing left once the hash suffixes are removed. That is a degenerate but
/// valid output, not an error.
pub fn derive_deployment_name(pod_name: &str) -> String {
    let segments: Vec<&str> = pod_name.split('-').collect();
    if segments.len() <= 2 {
        return String::new();
    }
    segments[..segments.len() - 2].join("-")
}
