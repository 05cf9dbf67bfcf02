//! Testing utilities for deterministic pipeline tests.

pub mod mock_launcher;
pub mod mock_runtime;

pub use mock_launcher::{LaunchBehavior, LaunchRecord, MockLauncher};
pub use mock_runtime::{MockRuntime, RuntimeCall, RuntimeOp};

use inspect_proto::{DatasetInstance, SpecError, TestSpec, TestSpecProvider};
use std::collections::HashSet;

/// Test-spec provider that maps every instance to `img/<instance_id>`.
#[derive(Debug, Clone, Default)]
pub struct StaticSpecProvider {
    failing: HashSet<String>,
}

impl StaticSpecProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the provider fail for `instance_id`.
    pub fn failing_for(mut self, instance_id: impl Into<String>) -> Self {
        self.failing.insert(instance_id.into());
        self
    }

    /// Image key assigned to `instance_id`.
    pub fn image_for(instance_id: &str) -> String {
        format!("img/{instance_id}")
    }
}

impl TestSpecProvider for StaticSpecProvider {
    fn make_test_spec(&self, instance: &DatasetInstance) -> Result<TestSpec, SpecError> {
        if self.failing.contains(&instance.instance_id) {
            return Err(SpecError {
                instance_id: instance.instance_id.clone(),
                reason: "injected spec failure".to_string(),
            });
        }
        Ok(TestSpec {
            instance_id: instance.instance_id.clone(),
            instance_image_key: Self::image_for(&instance.instance_id),
            environment: instance.environment.clone(),
        })
    }
}
