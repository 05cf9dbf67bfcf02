//! In-memory container runtime for deterministic tests.

use async_trait::async_trait;
use inspect_proto::{ContainerRuntime, CreateRequest, RuntimeError};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Runtime operations that can be counted or made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeOp {
    ImageExists,
    Create,
    Start,
    Name,
    Stop,
    Remove,
    RemoveImage,
}

/// A recorded runtime call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCall {
    pub op: RuntimeOp,
    /// Image for image operations, container name for container operations.
    pub subject: String,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<RuntimeCall>,
    created: Vec<CreateRequest>,
    /// Live containers by id → name.
    containers: HashMap<String, String>,
    next_id: usize,
}

/// Fault injection rule: fail `op`, optionally only when the subject
/// contains `needle`.
#[derive(Debug, Clone)]
struct Fault {
    op: RuntimeOp,
    needle: Option<String>,
}

/// Mock [`ContainerRuntime`] that records every call.
///
/// All images exist unless marked missing. Clones share state, so a test can
/// keep one clone for assertions while the pipeline owns another.
#[derive(Debug, Clone, Default)]
pub struct MockRuntime {
    state: Arc<Mutex<State>>,
    missing_images: HashSet<String>,
    faults: Vec<Fault>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports `image` as absent.
    pub fn with_missing_image(mut self, image: impl Into<String>) -> Self {
        self.missing_images.insert(image.into());
        self
    }

    /// Fails every call of `op`.
    pub fn fail_on(mut self, op: RuntimeOp) -> Self {
        self.faults.push(Fault { op, needle: None });
        self
    }

    /// Fails calls of `op` whose subject contains `needle`.
    pub fn fail_on_matching(mut self, op: RuntimeOp, needle: impl Into<String>) -> Self {
        self.faults.push(Fault {
            op,
            needle: Some(needle.into()),
        });
        self
    }

    /// All calls in order.
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.lock().calls.clone()
    }

    /// Number of calls of `op`.
    pub fn count(&self, op: RuntimeOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Number of calls of `op` whose subject contains `needle`.
    pub fn count_matching(&self, op: RuntimeOp, needle: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.op == op && c.subject.contains(needle))
            .count()
    }

    /// Create requests in order.
    pub fn created(&self) -> Vec<CreateRequest> {
        self.lock().created.clone()
    }

    /// Containers created and not yet removed.
    pub fn live_containers(&self) -> usize {
        self.lock().containers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Records the call and applies fault rules.
    fn record(&self, op: RuntimeOp, subject: &str) -> Result<(), RuntimeError> {
        self.lock().calls.push(RuntimeCall {
            op,
            subject: subject.to_string(),
        });

        let faulted = self.faults.iter().any(|fault| {
            fault.op == op
                && fault
                    .needle
                    .as_deref()
                    .is_none_or(|needle| subject.contains(needle))
        });
        if faulted {
            return Err(RuntimeError::api(format!("injected {op:?} failure for {subject}")));
        }
        Ok(())
    }

    fn name_of(&self, id: &str) -> Result<String, RuntimeError> {
        self.lock()
            .containers
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        self.record(RuntimeOp::ImageExists, image)?;
        Ok(!self.missing_images.contains(image))
    }

    async fn create_container(&self, request: &CreateRequest) -> Result<String, RuntimeError> {
        self.record(RuntimeOp::Create, &request.name)?;
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("mock-{}", state.next_id);
        state.containers.insert(id.clone(), request.name.clone());
        state.created.push(request.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        let name = self.name_of(id)?;
        self.record(RuntimeOp::Start, &name)
    }

    async fn container_name(&self, id: &str) -> Result<String, RuntimeError> {
        let name = self.name_of(id)?;
        self.record(RuntimeOp::Name, &name)?;
        Ok(name)
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        let name = self.name_of(id)?;
        self.record(RuntimeOp::Stop, &name)
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        let name = self.name_of(id)?;
        self.record(RuntimeOp::Remove, &name)?;
        self.lock().containers.remove(id);
        Ok(())
    }

    async fn remove_image(&self, image: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeOp::RemoveImage, image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> CreateRequest {
        CreateRequest {
            name: name.to_string(),
            image: "img".to_string(),
            binds: vec![],
            command: vec![],
            user: None,
            working_dir: None,
            labels: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_tracks_container_lifecycle() {
        let runtime = MockRuntime::new();
        let id = runtime.create_container(&request("c1")).await.unwrap();
        assert_eq!(runtime.live_containers(), 1);
        assert_eq!(runtime.container_name(&id).await.unwrap(), "c1");

        runtime.remove_container(&id).await.unwrap();
        assert_eq!(runtime.live_containers(), 0);
        assert!(matches!(
            runtime.container_name(&id).await,
            Err(RuntimeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fault_matching_only_hits_named_container() {
        let runtime = MockRuntime::new().fail_on_matching(RuntimeOp::Start, "bad");
        let good = runtime.create_container(&request("good")).await.unwrap();
        let bad = runtime.create_container(&request("bad")).await.unwrap();

        assert!(runtime.start_container(&good).await.is_ok());
        assert!(runtime.start_container(&bad).await.is_err());
        assert_eq!(runtime.count(RuntimeOp::Start), 2);
        assert_eq!(runtime.count_matching(RuntimeOp::Start, "bad"), 1);
    }

    #[tokio::test]
    async fn test_missing_image() {
        let runtime = MockRuntime::new().with_missing_image("gone");
        assert!(!runtime.image_exists("gone").await.unwrap());
        assert!(runtime.image_exists("here").await.unwrap());
    }
}
