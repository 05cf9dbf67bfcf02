//! Per-instance container lifecycle.
//!
//! A [`ContainerSession`] owns exactly one container from creation to
//! removal. Release is scoped:
//! - the normal path awaits [`ContainerSession::close`];
//! - if the session is dropped without being closed (panic, cancelled
//!   future), `Drop` schedules the same teardown on the current runtime.
//!
//! The handle is moved out on release, so teardown runs at most once.
//! Teardown failures are logged and never returned.

use inspect_proto::{
    BuildError, CleanupError, CleanupStep, ContainerHandle, ContainerIdentity, ContainerRuntime,
    CreateRequest, DatasetInstance, MountSpec, SessionError, TestSpecProvider,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Command that keeps an idle inspection container alive.
const KEEP_ALIVE: [&str; 3] = ["tail", "-f", "/dev/null"];

/// Label carrying the run identifier on every container.
pub const RUN_ID_LABEL: &str = "retrieval-inspector.run-id";
/// Label carrying the instance id on every container.
pub const INSTANCE_ID_LABEL: &str = "retrieval-inspector.instance-id";

/// One container bound to one dataset instance.
pub struct ContainerSession {
    runtime: Arc<dyn ContainerRuntime>,
    handle: Option<ContainerHandle>,
    image: String,
    started: bool,
}

impl std::fmt::Debug for ContainerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerSession")
            .field("handle", &self.handle)
            .field("image", &self.image)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl ContainerSession {
    /// Name given to the container of `instance_id` in run `run_id`.
    pub fn container_name(instance_id: &str, run_id: &str) -> String {
        format!("sweb.eval.{instance_id}.{run_id}")
    }

    /// Materializes (but does not start) the container of `instance`.
    ///
    /// Fails with [`BuildError`] when the instance image is not available or
    /// the runtime refuses to create the container. Nothing is retried.
    pub async fn create(
        runtime: Arc<dyn ContainerRuntime>,
        specs: &dyn TestSpecProvider,
        instance: &DatasetInstance,
        run_id: &str,
        mounts: &MountSpec,
    ) -> Result<Self, SessionError> {
        let spec = specs.make_test_spec(instance)?;
        let image = spec.instance_image_key;
        let build_error = |reason: String| BuildError {
            instance_id: instance.instance_id.clone(),
            reason,
        };

        match runtime.image_exists(&image).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(build_error(format!(
                    "image {image} not found; build the environment images first"
                ))
                .into());
            }
            Err(e) => return Err(build_error(format!("cannot look up image {image}: {e}")).into()),
        }

        let mut labels = BTreeMap::new();
        labels.insert(RUN_ID_LABEL.to_string(), run_id.to_string());
        labels.insert(INSTANCE_ID_LABEL.to_string(), instance.instance_id.clone());

        let request = CreateRequest {
            name: Self::container_name(&instance.instance_id, run_id),
            image: image.clone(),
            binds: mounts.binds(),
            command: KEEP_ALIVE.iter().map(|s| (*s).to_string()).collect(),
            user: Some("root".to_string()),
            working_dir: None,
            labels,
        };
        debug!(
            container = %request.name,
            image = %request.image,
            binds = ?request.binds,
            "Creating container"
        );

        let id = runtime
            .create_container(&request)
            .await
            .map_err(|e| build_error(format!("cannot create container {}: {e}", request.name)))?;

        info!(
            instance_id = %instance.instance_id,
            container = %request.name,
            id = %id,
            "Container created"
        );

        Ok(Self {
            runtime,
            handle: Some(ContainerHandle {
                id,
                name: request.name,
                image: image.clone(),
                instance_id: instance.instance_id.clone(),
            }),
            image,
            started: false,
        })
    }

    /// The container this session owns, until it is released.
    pub fn handle(&self) -> Option<&ContainerHandle> {
        self.handle.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// Starts the container and returns its remote-addressable identity.
    ///
    /// May be called once per session; a failed start still counts.
    pub async fn start(&mut self) -> Result<ContainerIdentity, SessionError> {
        let handle = self.handle.as_ref().ok_or(SessionError::Released)?;
        if self.started {
            return Err(SessionError::AlreadyStarted {
                container_id: handle.id.clone(),
            });
        }
        self.started = true;

        self.runtime.start_container(&handle.id).await?;
        let name = self.runtime.container_name(&handle.id).await?;
        let identity = ContainerIdentity::from_container_name(&name);

        info!(container = %name, identity = %identity, "Container started");
        Ok(identity)
    }

    /// Stops and removes the container. Idempotent and best-effort.
    pub async fn stop_and_remove(&mut self) {
        if let Some(handle) = self.handle.take() {
            teardown(self.runtime.as_ref(), &handle, self.started).await;
        }
    }

    /// Removes the instance image. Best-effort; failures are logged.
    pub async fn remove_image(&self) {
        if let Err(e) = self.runtime.remove_image(&self.image).await {
            let err = CleanupError {
                step: CleanupStep::RemoveImage,
                target: self.image.clone(),
                source: e,
            };
            warn!(error = %err, "Image cleanup failed");
        } else {
            info!(image = %self.image, "Image removed");
        }
    }

    /// Releases the session: stop and remove the container, then optionally
    /// remove its image.
    pub async fn close(mut self, remove_image: bool) {
        self.stop_and_remove().await;
        if remove_image {
            self.remove_image().await;
        }
    }
}

impl Drop for ContainerSession {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let runtime = Arc::clone(&self.runtime);
        let started = self.started;

        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                warn!(
                    container = %handle.name,
                    "Session dropped before release, scheduling cleanup"
                );
                rt.spawn(async move {
                    teardown(runtime.as_ref(), &handle, started).await;
                });
            }
            Err(_) => {
                error!(
                    container = %handle.name,
                    id = %handle.id,
                    "No async runtime available to clean up container; remove it manually"
                );
            }
        }
    }
}

/// Stops (if started) and force-removes a container, logging every failure.
async fn teardown(runtime: &dyn ContainerRuntime, handle: &ContainerHandle, started: bool) {
    let mut failures = Vec::new();

    if started {
        if let Err(source) = runtime.stop_container(&handle.id).await {
            failures.push(CleanupError {
                step: CleanupStep::Stop,
                target: handle.name.clone(),
                source,
            });
        }
    }

    if let Err(source) = runtime.remove_container(&handle.id).await {
        failures.push(CleanupError {
            step: CleanupStep::Remove,
            target: handle.name.clone(),
            source,
        });
    }

    if failures.is_empty() {
        info!(container = %handle.name, "Container removed");
    } else {
        for failure in &failures {
            warn!(error = %failure, "Container cleanup failed");
        }
    }
}
