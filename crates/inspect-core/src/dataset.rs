//! Local dataset loading.
//!
//! Reads an exported retrieval dataset from disk. Two layouts are accepted:
//! a single JSON/JSONL file, or a directory holding one file per split
//! (`<dir>/<split>.jsonl` or `<dir>/<split>.json`).

use inspect_proto::DatasetInstance;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An ordered, immutable set of dataset instances.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    instances: Vec<DatasetInstance>,
}

impl Dataset {
    /// Builds a dataset from instances, rejecting duplicate ids.
    pub fn new(instances: Vec<DatasetInstance>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::new();
        for instance in &instances {
            if !seen.insert(instance.instance_id.as_str()) {
                return Err(DatasetError::DuplicateInstance(
                    instance.instance_id.clone(),
                ));
            }
        }
        Ok(Self { instances })
    }

    /// Loads the `split` of the dataset at `path`.
    pub fn load(path: impl AsRef<Path>, split: &str) -> Result<Self, DatasetError> {
        let file = Self::resolve(path.as_ref(), split)?;
        debug!(file = %file.display(), split = split, "Loading dataset");
        let content = std::fs::read_to_string(&file)?;

        let instances = if Self::is_json_array(&file, &content) {
            serde_json::from_str(&content).map_err(|source| DatasetError::Json {
                file: file.clone(),
                line: source.line(),
                source,
            })?
        } else {
            Self::parse_jsonl(&file, &content)?
        };

        let dataset = Self::new(instances)?;
        debug!(instances = dataset.len(), "Dataset loaded");
        Ok(dataset)
    }

    /// Picks the file to read for `split`.
    fn resolve(path: &Path, split: &str) -> Result<PathBuf, DatasetError> {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        if path.is_dir() {
            for ext in ["jsonl", "json"] {
                let candidate = path.join(format!("{split}.{ext}"));
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
        Err(DatasetError::NotFound {
            path: path.to_path_buf(),
            split: split.to_string(),
        })
    }

    /// `.json` files, or any file whose first non-blank byte opens an array.
    fn is_json_array(file: &Path, content: &str) -> bool {
        file.extension().is_some_and(|ext| ext == "json")
            || content.trim_start().starts_with('[')
    }

    fn parse_jsonl(file: &Path, content: &str) -> Result<Vec<DatasetInstance>, DatasetError> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| DatasetError::Json {
                    file: file.to_path_buf(),
                    line: idx + 1,
                    source,
                })
            })
            .collect()
    }

    /// Keeps only the listed instances, preserving dataset order.
    ///
    /// An empty list keeps everything.
    pub fn filter_ids(self, ids: &[String]) -> Self {
        if ids.is_empty() {
            return self;
        }
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Self {
            instances: self
                .instances
                .into_iter()
                .filter(|instance| wanted.contains(instance.instance_id.as_str()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DatasetInstance> {
        self.instances.iter()
    }

    pub fn instances(&self) -> &[DatasetInstance] {
        &self.instances
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a DatasetInstance;
    type IntoIter = std::slice::Iter<'a, DatasetInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}

/// Dataset loading errors.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error in {} at line {line}: {source}", .file.display())]
    Json {
        file: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("No dataset found at {} for split '{split}'", .path.display())]
    NotFound { path: PathBuf, split: String },

    #[error("Duplicate instance id: '{0}'")]
    DuplicateInstance(String),
}
