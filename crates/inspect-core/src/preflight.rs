//! Image availability check before the instance loop.
//!
//! Building environment images is left to the evaluation harness. This only
//! reports which instance images are absent so the operator learns about
//! them up front rather than one `BuildError` at a time.

use futures::stream::{self, StreamExt};
use inspect_proto::{ContainerRuntime, DatasetInstance, TestSpecProvider};
use tracing::{debug, info, warn};

/// An instance whose image could not be confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingImage {
    pub instance_id: String,
    /// Image key, when the test spec could be derived.
    pub image: Option<String>,
    pub reason: String,
}

/// Outcome of a pre-flight check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightReport {
    pub checked: usize,
    /// Missing images in dataset order.
    pub missing: Vec<MissingImage>,
}

impl PreflightReport {
    pub fn all_present(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks that every instance image exists, with at most `max_workers`
/// lookups in flight. Never fails the run.
pub async fn check_images(
    runtime: &dyn ContainerRuntime,
    specs: &dyn TestSpecProvider,
    instances: &[DatasetInstance],
    max_workers: usize,
) -> PreflightReport {
    let workers = max_workers.max(1);
    debug!(instances = instances.len(), workers, "Checking instance images");

    let results: Vec<Option<MissingImage>> = stream::iter(instances)
        .map(|instance| async move {
            let spec = match specs.make_test_spec(instance) {
                Ok(spec) => spec,
                Err(e) => {
                    return Some(MissingImage {
                        instance_id: instance.instance_id.clone(),
                        image: None,
                        reason: e.to_string(),
                    });
                }
            };
            let image = spec.instance_image_key;
            match runtime.image_exists(&image).await {
                Ok(true) => None,
                Ok(false) => Some(MissingImage {
                    instance_id: instance.instance_id.clone(),
                    image: Some(image),
                    reason: "image not found".to_string(),
                }),
                Err(e) => Some(MissingImage {
                    instance_id: instance.instance_id.clone(),
                    image: Some(image),
                    reason: e.to_string(),
                }),
            }
        })
        .buffered(workers)
        .collect()
        .await;

    let report = PreflightReport {
        checked: instances.len(),
        missing: results.into_iter().flatten().collect(),
    };

    for missing in &report.missing {
        warn!(
            instance_id = %missing.instance_id,
            image = ?missing.image,
            reason = %missing.reason,
            "Instance image unavailable; this instance will fail to build"
        );
    }
    info!(
        checked = report.checked,
        missing = report.missing.len(),
        "Image pre-flight complete"
    );

    report
}
