//! Instance image naming.
//!
//! Instance images follow the evaluation harness convention
//! `<namespace>/sweb.eval.<arch>.<instance_id>:<tag>`. The id is always
//! lowercased. Registries reject `__` in repository names, so namespaced keys
//! also replace `__` with `_1776_`.

use crate::config::SessionConfig;
use inspect_proto::{DatasetInstance, SpecError, TestSpec, TestSpecProvider};

/// Derives test specs from a fixed namespace, tag, and architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespacedSpecProvider {
    namespace: String,
    tag: String,
    arch: String,
}

impl NamespacedSpecProvider {
    pub fn new(
        namespace: impl Into<String>,
        tag: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            tag: tag.into(),
            arch: arch.into(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.namespace, &config.image_tag, &config.arch)
    }

    /// Image reference for `instance_id`.
    pub fn image_key(&self, instance_id: &str) -> String {
        let instance_id = instance_id.to_lowercase();
        if self.namespace.is_empty() {
            format!("sweb.eval.{}.{}:{}", self.arch, instance_id, self.tag)
        } else {
            let key = format!(
                "{}/sweb.eval.{}.{}:{}",
                self.namespace, self.arch, instance_id, self.tag
            );
            key.replace("__", "_1776_")
        }
    }
}

impl TestSpecProvider for NamespacedSpecProvider {
    fn make_test_spec(&self, instance: &DatasetInstance) -> Result<TestSpec, SpecError> {
        if instance.instance_id.trim().is_empty() {
            return Err(SpecError {
                instance_id: instance.instance_id.clone(),
                reason: "instance id is empty".to_string(),
            });
        }
        Ok(TestSpec {
            instance_id: instance.instance_id.clone(),
            instance_image_key: self.image_key(&instance.instance_id),
            environment: instance.environment.clone(),
        })
    }
}
