//! Volume layout for inspection containers.

use inspect_proto::{AccessMode, MountSpec};
use std::path::{Path, PathBuf};

/// Host directory holding the editor server cache, shared by all instances.
pub const EDITOR_SERVER_DIR: &str = ".editor-server";
/// Host directory holding editor settings, shared by all instances.
pub const EDITOR_CONFIG_DIR: &str = ".editor-config";
/// Host directory under which each instance gets its own output directory.
pub const OUTPUT_DIR: &str = "output";

pub const EDITOR_SERVER_BIND: &str = "/root/.vscode-server";
pub const EDITOR_CONFIG_BIND: &str = "/testbed/.vscode";
pub const OUTPUT_BIND: &str = "/output";

/// Plans the bind mounts of one instance container.
///
/// Pure: no directory is created or checked here.
#[derive(Debug, Default, Clone, Copy)]
pub struct MountPlanner;

impl MountPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Returns the three read-write mounts for `instance_id` under `mount_root`.
    pub fn plan(&self, mount_root: &Path, instance_id: &str) -> MountSpec {
        let mut spec = MountSpec::new();
        spec.insert(
            mount_root.join(EDITOR_SERVER_DIR),
            EDITOR_SERVER_BIND,
            AccessMode::ReadWrite,
        );
        spec.insert(
            mount_root.join(EDITOR_CONFIG_DIR),
            EDITOR_CONFIG_BIND,
            AccessMode::ReadWrite,
        );
        spec.insert(
            Self::output_dir(mount_root, instance_id),
            OUTPUT_BIND,
            AccessMode::ReadWrite,
        );
        spec
    }

    /// Per-instance output directory on the host.
    pub fn output_dir(mount_root: &Path, instance_id: &str) -> PathBuf {
        mount_root.join(OUTPUT_DIR).join(instance_id)
    }
}
