use async_trait::async_trait;
use log::debug;
use std::process::{Output, Stdio};
use tokio::process::Command;

use crate::container_management::types::{ContainerRecord, RunSpec};
use crate::error_handling::types::RuntimeError;

/// Control interface of a container runtime.
///
/// Every call goes to the runtime; implementations keep no state about
/// containers between calls.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Lightweight health probe, used once before any verb runs.
    async fn ping(&self) -> Result<(), RuntimeError>;

    /// Looks up a container by exact name, stopped ones included.
    async fn inspect(&self, name: &str) -> Result<Option<ContainerRecord>, RuntimeError>;

    async fn image_present(&self, image: &str) -> Result<bool, RuntimeError>;

    async fn pull(&self, image: &str) -> Result<(), RuntimeError>;

    /// Creates and starts a detached container.
    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError>;

    async fn start(&self, name: &str) -> Result<(), RuntimeError>;

    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;

    async fn remove(&self, name: &str) -> Result<(), RuntimeError>;

    /// Accumulated stdout and stderr of the container.
    async fn logs(&self, name: &str, tail: Option<usize>) -> Result<String, RuntimeError>;
}

/// [`ContainerRuntime`] backed by a docker-compatible command line tool.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn exec(&self, args: &[String]) -> Result<Output, RuntimeError> {
        // Only the subcommand is logged, `run` arguments carry the password.
        debug!(
            "Invoking {} {}",
            self.binary,
            args.first().map(String::as_str).unwrap_or_default()
        );

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RuntimeError::NotInstalled(self.binary.clone())
                } else {
                    RuntimeError::IoError(e)
                }
            })
    }

    /// Runs the command and returns its stdout, failing on a non-zero status.
    async fn exec_checked(&self, args: &[String]) -> Result<String, RuntimeError> {
        let output = self.exec(args).await?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: format!(
                    "{} {}",
                    self.binary,
                    args.first().map(String::as_str).unwrap_or_default()
                ),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn ping(&self) -> Result<(), RuntimeError> {
        let version = self
            .exec_checked(&args(&["info", "--format", "{{json .ServerVersion}}"]))
            .await?;
        debug!("{} server version: {}", self.binary, version.trim());
        Ok(())
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerRecord>, RuntimeError> {
        let stdout = self.exec_checked(&ps_args(name)).await?;
        let records = parse_ps_output(&stdout)?;
        Ok(records.into_iter().find(|r| r.has_name(name)))
    }

    async fn image_present(&self, image: &str) -> Result<bool, RuntimeError> {
        let stdout = self.exec_checked(&args(&["images", "-q", image])).await?;
        Ok(stdout.lines().any(|l| !l.trim().is_empty()))
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        self.exec_checked(&args(&["pull", image])).await?;
        Ok(())
    }

    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        let id = self.exec_checked(&run_args(spec)).await?;
        debug!("Created container {} ({})", spec.name, id.trim());
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec_checked(&args(&["start", name])).await?;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec_checked(&args(&["stop", name])).await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec_checked(&args(&["rm", name])).await?;
        Ok(())
    }

    async fn logs(&self, name: &str, tail: Option<usize>) -> Result<String, RuntimeError> {
        let output = self.exec(&logs_args(name, tail)).await?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: format!("{} logs", self.binary),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        // The runtime replays the container's stderr on its own stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

pub fn ps_args(name: &str) -> Vec<String> {
    args(&[
        "ps",
        "-a",
        "--no-trunc",
        "--filter",
        &format!("name={}", name),
        "--format",
        "{{json .}}",
    ])
}

pub fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut out = args(&["run", "-d", "--name", &spec.name]);
    out.push("--platform".to_string());
    out.push(spec.platform.clone());
    for (key, value) in &spec.env {
        out.push("-e".to_string());
        out.push(format!("{}={}", key, value));
    }
    out.push("-p".to_string());
    out.push(format!("{}:{}", spec.host_port, spec.container_port));
    out.push(spec.image.clone());
    out
}

pub fn logs_args(name: &str, tail: Option<usize>) -> Vec<String> {
    let mut out = args(&["logs"]);
    if let Some(n) = tail {
        out.push("--tail".to_string());
        out.push(n.to_string());
    }
    out.push(name.to_string());
    out
}

/// Parses newline-delimited JSON records, skipping blank lines.
pub fn parse_ps_output(stdout: &str) -> Result<Vec<ContainerRecord>, RuntimeError> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str::<ContainerRecord>(line)
                .map_err(|e| RuntimeError::ParseError(format!("{}: {}", e, line)))
        })
        .collect()
}
