//! Test-spec provider seam.

use crate::error::SpecError;
use crate::instance::DatasetInstance;
use serde_json::{Map, Value};

/// What the environment of an instance looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSpec {
    pub instance_id: String,

    /// Image reference the instance container runs.
    pub instance_image_key: String,

    /// Opaque environment descriptor carried over from the record.
    pub environment: Map<String, Value>,
}

/// Derives the test spec of a dataset instance.
pub trait TestSpecProvider: Send + Sync {
    fn make_test_spec(&self, instance: &DatasetInstance) -> Result<TestSpec, SpecError>;
}
