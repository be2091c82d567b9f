// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::manifest::Manifest;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// One of the four abstract partition roles. `BootTarget`
/// is not one of these four; it is whichever role the caller names with
/// `--boot-partition` (default `GkiRamdisk`), resolved separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionRole {
    Vbmeta,
    GkiKernel,
    GkiRamdisk,
    OtaCerts,
}

impl PartitionRole {
    /// Ordered candidate partition names, first-present wins.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::Vbmeta => &["vbmeta"],
            Self::GkiKernel => &["boot"],
            Self::GkiRamdisk => &["init_boot", "boot"],
            Self::OtaCerts => &["recovery", "vendor_boot", "boot"],
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "vbmeta" => Some(Self::Vbmeta),
            "gki_kernel" => Some(Self::GkiKernel),
            "gki_ramdisk" => Some(Self::GkiRamdisk),
            "otacerts" => Some(Self::OtaCerts),
            _ => None,
        }
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vbmeta => "vbmeta",
            Self::GkiKernel => "gki_kernel",
            Self::GkiRamdisk => "gki_ramdisk",
            Self::OtaCerts => "otacerts",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("cannot find a partition for role '{0}' in this manifest")]
    Unresolved(PartitionRole),
    #[error("boot partition '{0}' is neither a known role nor present in the manifest")]
    UnknownBootPartition(String),
}

/// Resolves all four roles to concrete partition names. Fails closed: if
/// any role cannot be resolved, the caller must not proceed to extraction.
pub fn resolve_roles(manifest: &Manifest) -> Result<HashMap<PartitionRole, String>, RoleError> {
    let present: std::collections::HashSet<&str> =
        manifest.partition_names().into_iter().collect();

    let mut out = HashMap::new();
    for role in [
        PartitionRole::Vbmeta,
        PartitionRole::GkiKernel,
        PartitionRole::GkiRamdisk,
        PartitionRole::OtaCerts,
    ] {
        let resolved = role
            .candidates()
            .iter()
            .find(|candidate| present.contains(*candidate))
            .ok_or(RoleError::Unresolved(role))?;
        out.insert(role, resolved.to_string());
    }
    Ok(out)
}

/// The set of concrete partitions that must be extracted and patched for
/// one `patch` invocation: the boot-role target (root patch) and the
/// otacerts-role target, deduplicated.
#[derive(Debug, Clone)]
pub struct RequiredImages {
    pub vbmeta: String,
    pub root_patch: String,
    pub otacerts: String,
}

impl RequiredImages {
    pub fn resolve(
        manifest: &Manifest,
        boot_partition_role: &str,
    ) -> Result<Self, RoleError> {
        let roles = resolve_roles(manifest)?;
        let present: std::collections::HashSet<&str> =
            manifest.partition_names().into_iter().collect();

        let root_patch = if let Some(role) = PartitionRole::parse(boot_partition_role) {
            roles.get(&role).cloned().ok_or(RoleError::Unresolved(role))?
        } else if present.contains(boot_partition_role) {
            boot_partition_role.to_string()
        } else {
            return Err(RoleError::UnknownBootPartition(boot_partition_role.to_string()));
        };

        Ok(Self {
            vbmeta: roles[&PartitionRole::Vbmeta].clone(),
            root_patch,
            otacerts: roles[&PartitionRole::OtaCerts].clone(),
        })
    }

    /// The distinct set of partitions that actually need extracting,
    /// merging `root_patch` and `otacerts` when they name the same
    /// partition.
    pub fn unique_non_vbmeta(&self) -> Vec<String> {
        let mut set = std::collections::BTreeSet::new();
        set.insert(self.root_patch.clone());
        set.insert(self.otacerts.clone());
        set.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::proto::{DeltaArchiveManifest, PartitionUpdate};

    fn manifest_with(names: &[&str]) -> Manifest {
        let manifest = DeltaArchiveManifest {
            partitions: names
                .iter()
                .map(|n| PartitionUpdate { partition_name: n.to_string(), ..Default::default() })
                .collect(),
            ..Default::default()
        };
        Manifest { manifest, raw: Vec::new(), version: 2 }
    }

    #[test]
    fn default_boot_partition_prefers_init_boot() {
        let m = manifest_with(&["boot", "init_boot", "vbmeta", "recovery"]);
        let req = RequiredImages::resolve(&m, "gki_ramdisk").unwrap();
        assert_eq!(req.root_patch, "init_boot");
        assert_eq!(req.otacerts, "recovery");
        assert_eq!(req.vbmeta, "vbmeta");
        assert!(!req.unique_non_vbmeta().contains(&"boot".to_string()));
    }

    #[test]
    fn falls_back_to_boot_without_init_boot() {
        let m = manifest_with(&["boot", "vbmeta", "recovery"]);
        let req = RequiredImages::resolve(&m, "gki_ramdisk").unwrap();
        assert_eq!(req.root_patch, "boot");
    }

    #[test]
    fn missing_role_partition_fails_closed() {
        let m = manifest_with(&["boot"]); // no vbmeta
        let err = RequiredImages::resolve(&m, "gki_ramdisk").unwrap_err();
        assert!(matches!(err, RoleError::Unresolved(PartitionRole::Vbmeta)));
    }
}
