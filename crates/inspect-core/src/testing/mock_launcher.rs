//! Scripted editor launcher for deterministic tests.

use async_trait::async_trait;
use inspect_proto::{ContainerIdentity, ExtractedPaths, LaunchError, LaunchOutcome, Launcher};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What a scripted launch does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchBehavior {
    /// The editor exits with this code.
    Exit(i32),
    /// The editor cannot be run.
    Fail(String),
    /// The launcher panics.
    Panic(String),
    /// The editor window is never closed.
    Hang,
}

/// A recorded launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    pub identity: ContainerIdentity,
    pub remote_folder: String,
    pub paths: ExtractedPaths,
}

#[derive(Debug, Default)]
struct State {
    script: VecDeque<LaunchBehavior>,
    launches: Vec<LaunchRecord>,
}

/// Mock [`Launcher`] that plays scripted behaviors in call order.
///
/// Once the script runs out, every launch exits with code 0.
#[derive(Debug, Clone, Default)]
pub struct MockLauncher {
    state: Arc<Mutex<State>>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plays `behaviors` for the first launches, in order.
    pub fn scripted(behaviors: Vec<LaunchBehavior>) -> Self {
        let launcher = Self::default();
        launcher.lock().script = behaviors.into();
        launcher
    }

    /// Every recorded launch in order.
    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.lock().launches.clone()
    }

    pub fn launch_count(&self) -> usize {
        self.lock().launches.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    fn command_line(
        &self,
        identity: &ContainerIdentity,
        remote_folder: &str,
        paths: &ExtractedPaths,
    ) -> String {
        let mut line = format!("mock-editor {}", identity.remote_uri(remote_folder));
        for path in paths {
            line.push(' ');
            line.push_str(path);
        }
        line
    }

    async fn launch(
        &self,
        identity: &ContainerIdentity,
        remote_folder: &str,
        paths: &ExtractedPaths,
    ) -> Result<LaunchOutcome, LaunchError> {
        let behavior = {
            let mut state = self.lock();
            state.launches.push(LaunchRecord {
                identity: identity.clone(),
                remote_folder: remote_folder.to_string(),
                paths: paths.clone(),
            });
            state.script.pop_front().unwrap_or(LaunchBehavior::Exit(0))
        };
        let command_line = self.command_line(identity, remote_folder, paths);

        match behavior {
            LaunchBehavior::Exit(code) => Ok(LaunchOutcome {
                command_line,
                success: code == 0,
                exit_code: Some(code),
            }),
            LaunchBehavior::Fail(message) => Err(LaunchError::Other(message)),
            LaunchBehavior::Panic(message) => panic!("{message}"),
            LaunchBehavior::Hang => std::future::pending().await,
        }
    }
}
