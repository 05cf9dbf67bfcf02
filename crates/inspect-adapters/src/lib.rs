//! # inspect-adapters
//!
//! Concrete implementations of the Retrieval Inspector seams:
//! - [`DockerRuntime`]: the container runtime, backed by the local Docker daemon
//! - [`EditorLauncher`]: a VS Code compatible editor attached to a container
//!
//! Both are swapped for the mocks in `inspect_core::testing` under test.

mod docker_runtime;
mod editor_launcher;

pub use docker_runtime::DockerRuntime;
pub use editor_launcher::{EditorInvocation, EditorLauncher};
