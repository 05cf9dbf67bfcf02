//! Error taxonomy shared by the pipeline stages.
//!
//! Only configuration and dataset errors are fatal, and those live in
//! `inspect-core`. Everything here is scoped to a single instance: the runner
//! logs it and moves on to the next record.

use std::error::Error as StdError;
use thiserror::Error;

/// Why no retrieval block could be captured from an instance's text.
///
/// Ordered by how far the scan got before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Error)]
pub enum BlockMiss {
    /// The text never mentions `[end of readme`.
    #[error("no `[end of readme]` marker")]
    NoReadmeMarker,

    /// A marker exists but is not closed by `]` and a newline on the same line.
    #[error("`[end of readme]` marker is not closed by `]` followed by a newline")]
    MalformedReadmeMarker,

    /// A well-formed marker has no `</code>` line after it.
    #[error("retrieval block after `[end of readme]` is never closed by `</code>`")]
    UnclosedBlock,
}

/// An instance whose text yields nothing to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractionMiss {
    /// No README-terminated code block.
    #[error("code block not found: {0}")]
    NoCodeBlock(BlockMiss),

    /// A code block exists but holds no `[start of <path>]` lines.
    #[error("no `[start of ...]` retrieval results in code block")]
    NoRetrievalResults,
}

/// A failed request against the container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime rejected or failed the request.
    #[error("container runtime request failed: {0}")]
    Api(#[source] Box<dyn StdError + Send + Sync>),

    /// The named image or container does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl RuntimeError {
    /// Wraps any error returned by a runtime client.
    pub fn api(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Api(err.into())
    }
}

/// The test-spec provider could not describe an instance's environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot derive test spec for {instance_id}: {reason}")]
pub struct SpecError {
    pub instance_id: String,
    pub reason: String,
}

/// The container for an instance cannot be constructed.
///
/// Never retried: image availability is the job of a prior bulk-build step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot build container for {instance_id}: {reason}")]
pub struct BuildError {
    pub instance_id: String,
    pub reason: String,
}

/// Errors raised while a session creates or starts its container.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// `start` was called twice on the same session.
    #[error("container {container_id} was already started")]
    AlreadyStarted { container_id: String },

    /// The session's container has already been stopped and removed.
    #[error("container session already released")]
    Released,

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Which teardown step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStep {
    Stop,
    Remove,
    RemoveImage,
}

impl std::fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let step = match self {
            CleanupStep::Stop => "stop container",
            CleanupStep::Remove => "remove container",
            CleanupStep::RemoveImage => "remove image",
        };
        f.write_str(step)
    }
}

/// A best-effort teardown step failed. Logged, never escalated.
#[derive(Debug, Error)]
#[error("failed to {step} {target}: {source}")]
pub struct CleanupError {
    pub step: CleanupStep,
    pub target: String,
    #[source]
    pub source: RuntimeError,
}

/// The editor process could not be run.
///
/// A non-zero editor exit is not an error; see `LaunchOutcome`.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn editor `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for editor `{binary}`: {source}")]
    Wait {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// A container identity that does not decode back to a container name.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("identity does not decode to UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("decoded identity `{0}` is missing the leading `/`")]
    MissingSeparator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_miss_display_names_the_reason() {
        let miss = ExtractionMiss::NoCodeBlock(BlockMiss::UnclosedBlock);
        let msg = miss.to_string();
        assert!(msg.starts_with("code block not found"));
        assert!(msg.contains("</code>"));
    }

    #[test]
    fn test_runtime_error_from_str() {
        let err = RuntimeError::api("daemon unreachable");
        assert_eq!(
            err.to_string(),
            "container runtime request failed: daemon unreachable"
        );
    }

    #[test]
    fn test_cleanup_error_display() {
        let err = CleanupError {
            step: CleanupStep::Remove,
            target: "abc123".to_string(),
            source: RuntimeError::NotFound("abc123".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to remove container abc123: not found: abc123"
        );
    }

    #[test]
    fn test_build_error_converts_into_session_error() {
        let err: SessionError = BuildError {
            instance_id: "astropy__astropy-12907".to_string(),
            reason: "image missing".to_string(),
        }
        .into();
        assert!(matches!(err, SessionError::Build(_)));
        assert!(err.to_string().contains("astropy__astropy-12907"));
    }
}
