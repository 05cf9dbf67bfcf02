//! Bind-mount specifications.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessMode {
    #[default]
    #[serde(rename = "rw")]
    ReadWrite,
}

impl AccessMode {
    /// Docker bind-mode suffix.
    pub fn as_str(self) -> &'static str {
        match self {
            AccessMode::ReadWrite => "rw",
        }
    }
}

/// Where a host directory lands inside the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Absolute path inside the container.
    pub bind: String,

    /// Access mode.
    pub mode: AccessMode,
}

/// Host path → container mount mapping, ordered by host path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountSpec {
    mounts: BTreeMap<PathBuf, Mount>,
}

impl MountSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mount, replacing any existing mount for the same host path.
    pub fn insert(&mut self, host: impl Into<PathBuf>, bind: impl Into<String>, mode: AccessMode) {
        self.mounts.insert(
            host.into(),
            Mount {
                bind: bind.into(),
                mode,
            },
        );
    }

    pub fn get(&self, host: &Path) -> Option<&Mount> {
        self.mounts.get(host)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Mount)> {
        self.mounts.iter().map(|(host, mount)| (host.as_path(), mount))
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Renders the mounts as Docker `host:container:mode` bind strings.
    pub fn binds(&self) -> Vec<String> {
        self.mounts
            .iter()
            .map(|(host, mount)| {
                format!("{}:{}:{}", host.display(), mount.bind, mount.mode.as_str())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binds_are_sorted_by_host_path() {
        let mut spec = MountSpec::new();
        spec.insert("/mnt/z", "/z", AccessMode::ReadWrite);
        spec.insert("/mnt/a", "/a", AccessMode::ReadWrite);
        assert_eq!(spec.binds(), vec!["/mnt/a:/a:rw", "/mnt/z:/z:rw"]);
    }

    #[test]
    fn test_insert_replaces_same_host() {
        let mut spec = MountSpec::new();
        spec.insert("/mnt/a", "/a", AccessMode::ReadWrite);
        spec.insert("/mnt/a", "/b", AccessMode::ReadWrite);
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.get(Path::new("/mnt/a")).unwrap().bind, "/b");
    }

    #[test]
    fn test_serializes_like_docker_volume_map() {
        let mut spec = MountSpec::new();
        spec.insert("/mnt/out", "/output", AccessMode::ReadWrite);
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["/mnt/out"]["bind"], "/output");
        assert_eq!(json["/mnt/out"]["mode"], "rw");
    }
}
