//! The instance loop.
//!
//! Drives extraction, mount planning, the container session, and the editor
//! for each dataset record in order. Instances are processed one at a time
//! because each one blocks on a human closing the editor. A failure in one
//! instance never stops the batch; only a shutdown signal does.

use crate::config::InspectorConfig;
use crate::extractor::RetrievalBlockExtractor;
use crate::mount_planner::MountPlanner;
use crate::session::ContainerSession;
use futures::FutureExt;
use inspect_proto::{
    ContainerIdentity, ContainerRuntime, DatasetInstance, ExtractedPaths, ExtractionMiss,
    Launcher, MountSpec, TestSpecProvider,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Per-run settings of the instance loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    pub run_id: String,
    pub mount_root: PathBuf,
    /// Repository folder inside the container.
    pub remote_folder: String,
    /// Remove each instance image after its session.
    pub remove_image: bool,
    /// Plan and log each instance without creating containers.
    pub dry_run: bool,
}

impl RunnerOptions {
    pub fn from_config(config: &InspectorConfig) -> Self {
        Self {
            run_id: config.run_id.clone(),
            mount_root: config.mount_root.clone(),
            remote_folder: config.editor.remote_folder.clone(),
            remove_image: config.session.remove_image,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What happened to one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceOutcome {
    /// The editor ran and was closed. The exit code is informational.
    Inspected { exit_code: Option<i32> },
    /// Dry run: the command that would have been launched.
    Planned { command_line: String },
    /// Nothing to inspect in the instance text.
    Skipped(ExtractionMiss),
    /// Container build, start, or editor launch failed.
    Failed(String),
    /// A shutdown signal arrived while the editor was open.
    Interrupted,
}

/// Outcome of one instance, with the number of paths it surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceReport {
    pub instance_id: String,
    pub paths: usize,
    pub outcome: InstanceOutcome,
}

/// Per-instance outcomes of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<InstanceReport>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&InstanceOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn inspected(&self) -> usize {
        self.count(|o| matches!(o, InstanceOutcome::Inspected { .. }))
    }

    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, InstanceOutcome::Planned { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, InstanceOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, InstanceOutcome::Failed(_)))
    }

    pub fn was_interrupted(&self) -> bool {
        self.reports
            .last()
            .is_some_and(|r| r.outcome == InstanceOutcome::Interrupted)
    }
}

/// Sequential driver of the inspection pipeline.
pub struct InstanceRunner {
    /// `None` when only planning; see [`InstanceRunner::planning`].
    runtime: Option<Arc<dyn ContainerRuntime>>,
    specs: Arc<dyn TestSpecProvider>,
    launcher: Arc<dyn Launcher>,
    extractor: RetrievalBlockExtractor,
    planner: MountPlanner,
    options: RunnerOptions,
    shutdown: Option<watch::Receiver<bool>>,
}

impl InstanceRunner {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        specs: Arc<dyn TestSpecProvider>,
        launcher: Arc<dyn Launcher>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            runtime: Some(runtime),
            specs,
            launcher,
            extractor: RetrievalBlockExtractor::new(),
            planner: MountPlanner::new(),
            options,
            shutdown: None,
        }
    }

    /// A runner that never talks to a container runtime. Every instance is
    /// planned as in a dry run.
    pub fn planning(
        specs: Arc<dyn TestSpecProvider>,
        launcher: Arc<dyn Launcher>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            runtime: None,
            specs,
            launcher,
            extractor: RetrievalBlockExtractor::new(),
            planner: MountPlanner::new(),
            options: options.with_dry_run(true),
            shutdown: None,
        }
    }

    /// Stops the loop once `shutdown` turns `true`.
    ///
    /// An open editor is abandoned and its container still cleaned up.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Processes `instances` in order.
    pub async fn run<'a, I>(&self, instances: I) -> RunSummary
    where
        I: IntoIterator<Item = &'a DatasetInstance>,
    {
        let mut summary = RunSummary::default();

        for instance in instances {
            if self.shutdown_requested() {
                warn!(
                    next = %instance.instance_id,
                    "Shutdown requested, not starting further instances"
                );
                break;
            }

            let report = self.run_instance(instance).await;
            let interrupted = report.outcome == InstanceOutcome::Interrupted;
            summary.reports.push(report);
            if interrupted {
                break;
            }
        }

        info!(
            inspected = summary.inspected(),
            planned = summary.planned(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            interrupted = summary.was_interrupted(),
            "Run complete"
        );
        summary
    }

    /// Processes a single instance. Never fails: every error becomes an
    /// outcome.
    pub async fn run_instance(&self, instance: &DatasetInstance) -> InstanceReport {
        let instance_id = instance.instance_id.clone();
        info!(instance_id = %instance_id, "Processing instance");

        let paths = match self.extractor.extract(&instance.text) {
            Ok(paths) => paths,
            Err(miss) => {
                match miss {
                    ExtractionMiss::NoCodeBlock(_) => {
                        error!(instance_id = %instance_id, reason = %miss, "Code block not found, skipping");
                    }
                    ExtractionMiss::NoRetrievalResults => {
                        warn!(instance_id = %instance_id, "Retrieval results not found, skipping");
                    }
                }
                return InstanceReport {
                    instance_id,
                    paths: 0,
                    outcome: InstanceOutcome::Skipped(miss),
                };
            }
        };
        info!(instance_id = %instance_id, paths = ?paths.as_slice(), "Retrieval results");

        let mounts = self
            .planner
            .plan(&self.options.mount_root, &instance.instance_id);

        let outcome = match &self.runtime {
            Some(runtime) if !self.options.dry_run => {
                self.inspect(runtime, instance, &paths, &mounts).await
            }
            _ => self.plan_only(instance, &paths, &mounts),
        };

        InstanceReport {
            instance_id,
            paths: paths.len(),
            outcome,
        }
    }

    fn plan_only(
        &self,
        instance: &DatasetInstance,
        paths: &ExtractedPaths,
        mounts: &MountSpec,
    ) -> InstanceOutcome {
        let name = ContainerSession::container_name(&instance.instance_id, &self.options.run_id);
        let identity = ContainerIdentity::from_container_name(&name);
        let command_line = self
            .launcher
            .command_line(&identity, &self.options.remote_folder, paths);
        info!(
            instance_id = %instance.instance_id,
            container = %name,
            binds = ?mounts.binds(),
            command = %command_line,
            "Dry run, not creating container"
        );
        InstanceOutcome::Planned { command_line }
    }

    /// Create, start, launch, and always release.
    async fn inspect(
        &self,
        runtime: &Arc<dyn ContainerRuntime>,
        instance: &DatasetInstance,
        paths: &ExtractedPaths,
        mounts: &MountSpec,
    ) -> InstanceOutcome {
        let mut session = match ContainerSession::create(
            Arc::clone(runtime),
            self.specs.as_ref(),
            instance,
            &self.options.run_id,
            mounts,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                error!(instance_id = %instance.instance_id, error = %e, "Failed to build container, skipping");
                return InstanceOutcome::Failed(e.to_string());
            }
        };

        let result = AssertUnwindSafe(self.start_and_launch(&mut session, paths))
            .catch_unwind()
            .await;
        session.close(self.options.remove_image).await;

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(message)) => {
                error!(instance_id = %instance.instance_id, error = %message, "Inspection failed");
                InstanceOutcome::Failed(message)
            }
            Err(payload) => {
                let message = format!("editor launch panicked: {}", panic_message(&*payload));
                error!(instance_id = %instance.instance_id, error = %message, "Inspection failed");
                InstanceOutcome::Failed(message)
            }
        }
    }

    async fn start_and_launch(
        &self,
        session: &mut ContainerSession,
        paths: &ExtractedPaths,
    ) -> Result<InstanceOutcome, String> {
        let identity = session.start().await.map_err(|e| e.to_string())?;
        if self.shutdown_requested() {
            warn!("Shutdown requested before editor launch");
            return Ok(InstanceOutcome::Interrupted);
        }
        let launch = self
            .launcher
            .launch(&identity, &self.options.remote_folder, paths);

        let result = match self.shutdown.clone() {
            Some(mut shutdown) => {
                tokio::select! {
                    biased;
                    () = wait_for_shutdown(&mut shutdown) => {
                        warn!("Shutdown requested, abandoning editor session");
                        return Ok(InstanceOutcome::Interrupted);
                    }
                    result = launch => result,
                }
            }
            None => launch.await,
        };

        let outcome = result.map_err(|e| e.to_string())?;
        if outcome.success {
            info!(command = %outcome.command_line, "Editor closed");
        } else {
            info!(exit_code = ?outcome.exit_code, "Editor exited with non-zero status");
        }
        Ok(InstanceOutcome::Inspected {
            exit_code: outcome.exit_code,
        })
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

/// Resolves once the flag is `true`. Never resolves if the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
