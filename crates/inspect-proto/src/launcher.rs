//! Editor launcher seam.

use crate::error::LaunchError;
use crate::identity::ContainerIdentity;
use crate::paths::ExtractedPaths;
use async_trait::async_trait;

/// Result of one editor session.
///
/// The exit code is reported, never interpreted: a non-zero exit does not
/// fail the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// The command line that was run.
    pub command_line: String,

    /// Whether the editor exited with code 0.
    pub success: bool,

    /// The exit code, if the editor exited normally.
    pub exit_code: Option<i32>,
}

/// Opens extracted paths inside a running container for manual inspection.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Renders the command line `launch` would run.
    fn command_line(
        &self,
        identity: &ContainerIdentity,
        remote_folder: &str,
        paths: &ExtractedPaths,
    ) -> String;

    /// Runs the editor and blocks until the user closes it.
    async fn launch(
        &self,
        identity: &ContainerIdentity,
        remote_folder: &str,
        paths: &ExtractedPaths,
    ) -> Result<LaunchOutcome, LaunchError>;
}
