//! Container management subsystem.
//!
//! Brings the single named SQL Server container to the state a verb asks for.
//! The runtime is the only source of truth: every operation re-queries it, so
//! repeating a verb is always safe.
//!
//! Re-exports:
//! - [`ContainerManager`]: the lifecycle entry point.
//! - [`ContainerRuntime`], [`DockerCli`]: the runtime seam and its CLI backend.
//! - [`ContainerState`], [`Outcome`], [`Report`], [`Verb`]: core types.
//!
//! Example (non-running):
//! ```ignore
//! use sqlctl::configuration::Config;
//! use sqlctl::container_management::{ContainerManager, DockerCli, Verb};
//!
//! let config = Config::load(None)?;
//! let manager = ContainerManager::new(DockerCli::new(&config.runtime), &config);
//! let report = manager.run(Verb::Status).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod container_manager;
pub mod runtime;
#[cfg(test)]
pub mod test_support;
#[cfg(test)]
pub mod tests;
pub mod types;

pub use container_manager::{ContainerManager, SettlePolicy};
pub use runtime::{ContainerRuntime, DockerCli};
pub use types::{
    ContainerRecord, ContainerState, Outcome, Report, RunSpec, StatusReport, Verb,
};
