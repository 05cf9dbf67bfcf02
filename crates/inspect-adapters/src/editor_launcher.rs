//! Editor launcher for attached-container sessions.
//!
//! Opens the repository folder and every retrieved file in a new editor
//! window attached to the instance container, then waits for the window to
//! close. The editor is spawned directly with an argument vector; no shell
//! is involved.

use async_trait::async_trait;
use inspect_proto::{ContainerIdentity, ExtractedPaths, LaunchError, LaunchOutcome, Launcher};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// A fully resolved editor command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl EditorInvocation {
    /// Renders the invocation as one command line for logs.
    ///
    /// Values containing whitespace are double-quoted.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|value| quote(value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(value: &str) -> String {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Launches a VS Code compatible editor attached to a container.
#[derive(Debug, Clone)]
pub struct EditorLauncher {
    binary: String,
    profile: String,
}

impl EditorLauncher {
    pub fn new(binary: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            profile: profile.into(),
        }
    }

    /// Builds the invocation that opens `paths` under `remote_folder`.
    pub fn build_invocation(
        &self,
        identity: &ContainerIdentity,
        remote_folder: &str,
        paths: &ExtractedPaths,
    ) -> EditorInvocation {
        let folder = remote_folder.trim_end_matches('/');
        let mut args = vec![
            "--new-window".to_string(),
            "--wait".to_string(),
            "--profile".to_string(),
            self.profile.clone(),
            "--folder-uri".to_string(),
            identity.remote_uri(folder),
        ];
        for path in paths {
            args.push("--file-uri".to_string());
            args.push(identity.remote_uri(&format!("{folder}/{path}")));
        }

        EditorInvocation {
            program: self.binary.clone(),
            args,
        }
    }
}

#[async_trait]
impl Launcher for EditorLauncher {
    fn command_line(
        &self,
        identity: &ContainerIdentity,
        remote_folder: &str,
        paths: &ExtractedPaths,
    ) -> String {
        self.build_invocation(identity, remote_folder, paths)
            .command_line()
    }

    async fn launch(
        &self,
        identity: &ContainerIdentity,
        remote_folder: &str,
        paths: &ExtractedPaths,
    ) -> Result<LaunchOutcome, LaunchError> {
        let invocation = self.build_invocation(identity, remote_folder, paths);
        let command_line = invocation.command_line();
        info!(command = %command_line, "Opening editor");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
            binary: invocation.program.clone(),
            source,
        })?;
        debug!(pid = ?child.id(), "Editor spawned, waiting for window to close");

        let status = child.wait().await.map_err(|source| LaunchError::Wait {
            binary: invocation.program.clone(),
            source,
        })?;

        Ok(LaunchOutcome {
            command_line,
            success: status.success(),
            exit_code: status.code(),
        })
    }
}
