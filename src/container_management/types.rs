//! Core types used by the container management subsystem.

use serde::Deserialize;
use std::fmt;

use crate::configuration::Config;

/// Port the SQL Server process listens on inside the container.
pub const CONTAINER_SQL_PORT: u16 = 1433;

/// State of the managed container as reported by the runtime right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::Absent => write!(f, "absent"),
            ContainerState::Stopped => write!(f, "stopped"),
            ContainerState::Running => write!(f, "running"),
        }
    }
}

/// One line of `ps --format '{{json .}}'` output.
///
/// Only the fields the manager looks at are kept; the runtime emits many more.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContainerRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Names")]
    pub names: String,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Ports", default)]
    pub ports: String,
}

impl ContainerRecord {
    /// True when one of the record's names equals `name` exactly.
    ///
    /// Runtimes report names comma separated and sometimes with a leading `/`.
    pub fn has_name(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.names
            .split(',')
            .map(normalize_name)
            .any(|candidate| candidate == wanted)
    }

    /// Running, paused and restarting containers all show up in the runtime's
    /// active list, so they count as running.
    pub fn is_running(&self) -> bool {
        matches!(
            self.state.trim().to_ascii_lowercase().as_str(),
            "running" | "paused" | "restarting"
        )
    }

    pub fn container_state(&self) -> ContainerState {
        if self.is_running() {
            ContainerState::Running
        } else {
            ContainerState::Stopped
        }
    }
}

pub fn normalize_name(name: &str) -> &str {
    name.trim().trim_start_matches('/')
}

/// Everything needed to create the managed container.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpec {
    pub name: String,
    pub image: String,
    pub platform: String,
    pub host_port: String,
    pub container_port: u16,
    pub env: Vec<(String, String)>,
}

impl RunSpec {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.container_name.clone(),
            image: config.image.clone(),
            platform: config.platform.clone(),
            host_port: config.port.clone(),
            container_port: CONTAINER_SQL_PORT,
            env: vec![
                ("ACCEPT_EULA".to_string(), "Y".to_string()),
                ("MSSQL_SA_PASSWORD".to_string(), config.password.clone()),
            ],
        }
    }
}

/// Result of a lifecycle action that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Started { created: bool },
    AlreadyRunning,
    Stopped,
    AlreadyStopped,
    NotFound,
    Removed { was_running: bool },
}

impl Outcome {
    /// No-ops are reported as warnings and never fail the invocation.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            Outcome::AlreadyRunning | Outcome::AlreadyStopped | Outcome::NotFound
        )
    }

    pub fn describe(&self, name: &str) -> String {
        match self {
            Outcome::Started { created: true } => {
                format!("Container {} created and running", name)
            }
            Outcome::Started { created: false } => format!("Container {} started", name),
            Outcome::AlreadyRunning => format!("Container {} is already running", name),
            Outcome::Stopped => format!("Container {} stopped", name),
            Outcome::AlreadyStopped => format!("Container {} is already stopped", name),
            Outcome::NotFound => format!("Container {} does not exist", name),
            Outcome::Removed { was_running: true } => {
                format!("Container {} stopped and removed", name)
            }
            Outcome::Removed { was_running: false } => format!("Container {} removed", name),
        }
    }
}

/// A verb addressed to the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Start,
    Stop,
    Restart,
    Remove,
    Status,
    Logs { tail: Option<usize> },
}

impl Verb {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Verb::Status | Verb::Logs { .. })
    }
}

/// What a verb produced, for the caller to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Steps(Vec<Outcome>),
    Status(StatusReport),
    /// `None` when the container does not exist.
    Logs(Option<String>),
}

/// Read-only snapshot printed by `status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub name: String,
    pub state: ContainerState,
    pub record: Option<ContainerRecord>,
    pub server: String,
    pub port: String,
    pub database: String,
    pub user: String,
    pub masked_password: String,
    pub image: String,
}

impl StatusReport {
    pub fn new(config: &Config, record: Option<ContainerRecord>) -> Self {
        let state = record
            .as_ref()
            .map(ContainerRecord::container_state)
            .unwrap_or(ContainerState::Absent);
        Self {
            name: config.container_name.clone(),
            state,
            record,
            server: config.host.clone(),
            port: config.port.clone(),
            database: config.database.clone(),
            user: config.user.clone(),
            masked_password: config.masked_password(),
            image: config.image.clone(),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Container: {}", self.name)?;
        writeln!(f, "  State:    {}", self.state)?;
        if let Some(record) = &self.record {
            writeln!(f, "  ID:       {}", record.id)?;
            writeln!(f, "  Status:   {}", record.status)?;
            if !record.ports.is_empty() {
                writeln!(f, "  Ports:    {}", record.ports)?;
            }
        }
        writeln!(f, "  Image:    {}", self.image)?;
        writeln!(f, "Connection:")?;
        writeln!(f, "  Server:   {}", self.server)?;
        writeln!(f, "  Port:     {}", self.port)?;
        writeln!(f, "  Database: {}", self.database)?;
        writeln!(f, "  User:     {}", self.user)?;
        write!(f, "  Password: {}", self.masked_password)
    }
}
