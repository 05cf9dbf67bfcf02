//! # inspect-proto
//!
//! Shared types, error definitions, and traits for Retrieval Inspector.
//!
//! This crate provides the foundational abstractions used across all inspector
//! crates, including:
//! - Dataset instances and the paths extracted from their retrieval text
//! - Mount specifications and container identities
//! - The container runtime, editor launcher, and test-spec provider seams
//! - The error taxonomy shared by the pipeline stages

mod error;
mod identity;
mod instance;
mod launcher;
mod mount;
mod paths;
mod runtime;
mod test_spec;

pub use error::{
    BlockMiss, BuildError, CleanupError, CleanupStep, ExtractionMiss, IdentityError, LaunchError,
    RuntimeError, SessionError, SpecError,
};
pub use identity::{ContainerIdentity, REMOTE_SCHEME};
pub use instance::DatasetInstance;
pub use launcher::{LaunchOutcome, Launcher};
pub use mount::{AccessMode, Mount, MountSpec};
pub use paths::ExtractedPaths;
pub use runtime::{ContainerHandle, ContainerRuntime, CreateRequest};
pub use test_spec::{TestSpec, TestSpecProvider};
