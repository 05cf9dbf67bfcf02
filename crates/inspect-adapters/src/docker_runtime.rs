//! Docker Engine implementation of [`ContainerRuntime`].
//!
//! Talks to the local daemon through bollard. One `DockerRuntime` is opened
//! at startup and shared by every session of the run.

use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, InspectContainerOptions, RemoveContainerOptionsBuilder,
    RemoveImageOptionsBuilder, StartContainerOptions, StopContainerOptionsBuilder,
};
use inspect_proto::{ContainerRuntime, CreateRequest, RuntimeError};
use std::collections::HashMap;
use tracing::debug;

/// Container runtime backed by the local Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
    stop_timeout_secs: i32,
}

impl DockerRuntime {
    /// Connects using the platform defaults (`DOCKER_HOST` or the local socket).
    pub fn connect(stop_timeout_secs: i32) -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults().map_err(RuntimeError::api)?;
        Ok(Self::with_client(docker, stop_timeout_secs))
    }

    /// Wraps an existing client.
    pub fn with_client(docker: Docker, stop_timeout_secs: i32) -> Self {
        Self {
            docker,
            stop_timeout_secs,
        }
    }

    /// Checks that the daemon answers.
    pub async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await.map_err(RuntimeError::api)?;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(RuntimeError::api(e)),
        }
    }

    async fn create_container(&self, request: &CreateRequest) -> Result<String, RuntimeError> {
        let options = CreateContainerOptionsBuilder::default()
            .name(&request.name)
            .build();
        debug!(name = %request.name, image = %request.image, "Creating Docker container");
        let response = self
            .docker
            .create_container(Some(options), create_body(request))
            .await
            .map_err(RuntimeError::api)?;
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions>)
            .await
            .map_err(|e| map_error(e, id))
    }

    async fn container_name(&self, id: &str) -> Result<String, RuntimeError> {
        let details = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_error(e, id))?;
        details
            .name
            .as_deref()
            .map(normalize_name)
            .ok_or_else(|| RuntimeError::NotFound(format!("name of container {id}")))
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        let options = StopContainerOptionsBuilder::default()
            .t(self.stop_timeout_secs)
            .build();
        self.docker
            .stop_container(id, Some(options))
            .await
            .map_err(|e| map_error(e, id))
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptionsBuilder::default().force(true).build();
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| map_error(e, id))
    }

    async fn remove_image(&self, image: &str) -> Result<(), RuntimeError> {
        let options = RemoveImageOptionsBuilder::default().force(true).build();
        let deleted = self
            .docker
            .remove_image(image, Some(options), None)
            .await
            .map_err(|e| map_error(e, image))?;
        debug!(image, layers = deleted.len(), "Docker image removed");
        Ok(())
    }
}

/// Builds the create body for a request.
fn create_body(request: &CreateRequest) -> ContainerCreateBody {
    let labels: HashMap<String, String> = request
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    ContainerCreateBody {
        image: Some(request.image.clone()),
        cmd: (!request.command.is_empty()).then(|| request.command.clone()),
        user: request.user.clone(),
        working_dir: request.working_dir.clone(),
        labels: (!labels.is_empty()).then_some(labels),
        tty: Some(false),
        host_config: Some(HostConfig {
            binds: Some(request.binds.clone()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Docker reports container names with a leading `/`.
fn normalize_name(name: &str) -> String {
    name.trim_start_matches('/').to_string()
}

fn is_not_found(err: &DockerError) -> bool {
    matches!(
        err,
        DockerError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn map_error(err: DockerError, subject: &str) -> RuntimeError {
    if is_not_found(&err) {
        RuntimeError::NotFound(subject.to_string())
    } else {
        RuntimeError::api(err)
    }
}
