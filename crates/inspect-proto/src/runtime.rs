//! Container runtime seam.
//!
//! The pipeline talks to the container engine only through
//! [`ContainerRuntime`]. One client handle is opened at startup and shared by
//! every session for the whole run.

use crate::error::RuntimeError;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Everything the runtime needs to materialize a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Requested container name.
    pub name: String,

    /// Image to run.
    pub image: String,

    /// Docker-style `host:container:mode` bind strings.
    pub binds: Vec<String>,

    /// Command that keeps the container alive.
    pub command: Vec<String>,

    /// User to run as.
    pub user: Option<String>,

    /// Working directory inside the container.
    pub working_dir: Option<String>,

    pub labels: BTreeMap<String, String>,
}

/// A created container owned by one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Runtime-assigned container id.
    pub id: String,

    /// Name requested at creation.
    pub name: String,

    /// Image the container runs.
    pub image: String,

    /// Dataset instance the container belongs to.
    pub instance_id: String,
}

/// Operations the pipeline needs from a container engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns whether `image` is available locally.
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    /// Creates (but does not start) a container. Returns its id.
    async fn create_container(&self, request: &CreateRequest) -> Result<String, RuntimeError>;

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Returns the runtime-assigned name, without any leading `/`.
    async fn container_name(&self, id: &str) -> Result<String, RuntimeError>;

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Force-removes a container.
    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove_image(&self, image: &str) -> Result<(), RuntimeError>;
}
