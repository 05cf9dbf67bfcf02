//! # inspect-core
//!
//! Core pipeline of the Retrieval Inspector.
//!
//! This crate provides:
//! - Extraction of retrieved file paths from instance prompt text
//! - Host mount planning for the editor's persistent state
//! - Scoped container sessions with guaranteed cleanup
//! - The sequential instance loop with per-instance fault isolation
//! - Configuration, dataset loading, and image pre-flight checks

mod config;
mod dataset;
mod extractor;
pub mod mount_planner;
mod preflight;
mod runner;
mod session;
mod test_spec;
pub mod testing;

pub use config::{
    ConfigError, ConfigOverrides, DatasetConfig, EditorConfig, InspectorConfig, PreflightConfig,
    SessionConfig,
};
pub use dataset::{Dataset, DatasetError};
pub use extractor::RetrievalBlockExtractor;
pub use mount_planner::MountPlanner;
pub use preflight::{MissingImage, PreflightReport, check_images};
pub use runner::{InstanceOutcome, InstanceReport, InstanceRunner, RunSummary, RunnerOptions};
pub use session::{ContainerSession, INSTANCE_ID_LABEL, RUN_ID_LABEL};
pub use test_spec::NamespacedSpecProvider;
