//! Configuration types for Retrieval Inspector.
//!
//! Everything has a default, so an empty file (or no file at all) is a valid
//! configuration as long as the editor binary is given on the command line.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Which dataset to walk.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Run identifier used to label containers.
    #[serde(default = "default_run_id")]
    pub run_id: String,

    /// Host directory holding the editor cache, editor config, and outputs.
    #[serde(default = "default_mount_root")]
    pub mount_root: PathBuf,

    #[serde(default)]
    pub editor: EditorConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub preflight: PreflightConfig,
}

fn default_run_id() -> String {
    "test".to_string()
}

fn default_mount_root() -> PathBuf {
    PathBuf::from("/mnt/sweb")
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            run_id: default_run_id(),
            mount_root: default_mount_root(),
            editor: EditorConfig::default(),
            session: SessionConfig::default(),
            preflight: PreflightConfig::default(),
        }
    }
}

/// Dataset selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// A JSON/JSONL file, or a directory holding `<split>.jsonl`.
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,

    #[serde(default = "default_split")]
    pub split: String,

    /// When non-empty, only these instances are inspected.
    #[serde(default)]
    pub instance_ids: Vec<String>,
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("SWE-bench_Lite_bm25_13K")
}

fn default_split() -> String {
    "dev".to_string()
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            split: default_split(),
            instance_ids: Vec::new(),
        }
    }
}

/// External editor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Path to the editor's command-line launcher.
    #[serde(default)]
    pub binary: String,

    /// Named editor profile the window opens under.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Folder inside the container that holds the repository.
    #[serde(default = "default_remote_folder")]
    pub remote_folder: String,
}

fn default_profile() -> String {
    "SWE-bench".to_string()
}

fn default_remote_folder() -> String {
    "/testbed".to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            binary: String::new(),
            profile: default_profile(),
            remote_folder: default_remote_folder(),
        }
    }
}

/// Container session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Image namespace; empty for locally built images.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_image_tag")]
    pub image_tag: String,

    #[serde(default = "default_arch")]
    pub arch: String,

    /// Remove the instance image after each session. Expensive; off by default.
    #[serde(default)]
    pub remove_image: bool,

    /// Seconds the runtime waits for a graceful stop before killing.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: i32,
}

fn default_namespace() -> String {
    "swebench".to_string()
}

fn default_image_tag() -> String {
    "latest".to_string()
}

fn default_arch() -> String {
    "x86_64".to_string()
}

fn default_stop_timeout() -> i32 {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            image_tag: default_image_tag(),
            arch: default_arch(),
            remove_image: false,
            stop_timeout_secs: default_stop_timeout(),
        }
    }
}

/// Image availability check before the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on concurrent image lookups.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_workers() -> usize {
    4
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_workers: default_max_workers(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dataset_path: Option<PathBuf>,
    pub split: Option<String>,
    pub run_id: Option<String>,
    pub editor: Option<String>,
    pub profile: Option<String>,
    pub mount_root: Option<PathBuf>,
    pub instance_ids: Vec<String>,
    pub remove_image: bool,
    pub preflight_workers: Option<usize>,
}

impl InspectorConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        debug!(path = %path_ref.display(), "Loading configuration from file");
        let content = std::fs::read_to_string(path_ref)?;
        let config: Self = serde_yaml::from_str(&content)?;
        debug!(
            run_id = %config.run_id,
            dataset = %config.dataset.path.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn from_file_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        if path_ref.exists() {
            Self::from_file(path_ref)
        } else {
            debug!(path = %path_ref.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Applies command-line overrides. Set values replace file values;
    /// `remove_image` can only be switched on.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.dataset_path {
            self.dataset.path = path;
        }
        if let Some(split) = overrides.split {
            self.dataset.split = split;
        }
        if let Some(run_id) = overrides.run_id {
            self.run_id = run_id;
        }
        if let Some(editor) = overrides.editor {
            self.editor.binary = editor;
        }
        if let Some(profile) = overrides.profile {
            self.editor.profile = profile;
        }
        if let Some(root) = overrides.mount_root {
            self.mount_root = root;
        }
        if !overrides.instance_ids.is_empty() {
            self.dataset.instance_ids = overrides.instance_ids;
        }
        if overrides.remove_image {
            self.session.remove_image = true;
        }
        if let Some(workers) = overrides.preflight_workers {
            self.preflight.max_workers = workers;
        }
    }

    /// Rejects settings that cannot produce a working run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_id.trim().is_empty() {
            return Err(ConfigError::Invalid("run_id must not be empty".to_string()));
        }
        if self.editor.binary.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "editor binary is required (set editor.binary or pass --editor)".to_string(),
            ));
        }
        if self.preflight.enabled && self.preflight.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "preflight.max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
