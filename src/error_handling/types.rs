use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    IoError(String, std::io::Error),
    TomlError(String),
    FileNotFound(String),
    InvalidValue(String, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(path, e) => write!(f, "IO error reading {}: {}", path, e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::FileNotFound(path) => write!(f, "Settings file not found: {}", path),
            ConfigError::InvalidValue(key, value) => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failures reported by the container runtime CLI itself.
#[derive(Debug)]
pub enum RuntimeError {
    NotInstalled(String),
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    ParseError(String),
    IoError(std::io::Error),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::NotInstalled(bin) => write!(f, "Container runtime `{}` not found", bin),
            RuntimeError::CommandFailed {
                command,
                code,
                stderr,
            } => match code {
                Some(code) => write!(f, "`{}` exited with status {}: {}", command, code, stderr),
                None => write!(f, "`{}` was terminated by a signal: {}", command, stderr),
            },
            RuntimeError::ParseError(e) => write!(f, "Unable to parse runtime output: {}", e),
            RuntimeError::IoError(e) => write!(f, "Runtime IO error: {}", e),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Fatal outcomes of a lifecycle verb. No-ops are never represented here.
#[derive(Debug)]
pub enum LifecycleError {
    RuntimeUnreachable(RuntimeError),
    QueryFailed(RuntimeError),
    ActionFailed {
        action: &'static str,
        name: String,
        source: RuntimeError,
    },
    NotRunningAfterStart {
        name: String,
        waited: Duration,
    },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::RuntimeUnreachable(e) => {
                write!(f, "Container runtime is not reachable: {}", e)
            }
            LifecycleError::QueryFailed(e) => write!(f, "Container query failed: {}", e),
            LifecycleError::ActionFailed {
                action,
                name,
                source,
            } => write!(f, "Failed to {} container {}: {}", action, name, source),
            LifecycleError::NotRunningAfterStart { name, waited } => write!(
                f,
                "Container {} is not running after {}s",
                name,
                waited.as_secs()
            ),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::RuntimeUnreachable(e) | LifecycleError::QueryFailed(e) => Some(e),
            LifecycleError::ActionFailed { source, .. } => Some(source),
            LifecycleError::NotRunningAfterStart { .. } => None,
        }
    }
}

#[derive(Debug)]
pub enum DatabaseError {
    InvalidPort(String),
    ConnectionFailed(String),
    Timeout(Duration),
    QueryFailed(String),
    EmptyResult(String),
    NoOdbcDriver,
    OdbcDisabled,
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::InvalidPort(p) => write!(f, "Invalid database port: {:?}", p),
            DatabaseError::ConnectionFailed(e) => write!(f, "Database connection failed: {}", e),
            DatabaseError::Timeout(d) => {
                write!(f, "Database connection timed out after {}s", d.as_secs())
            }
            DatabaseError::QueryFailed(e) => write!(f, "Query execution failed: {}", e),
            DatabaseError::EmptyResult(q) => write!(f, "Query returned no rows: {}", q),
            DatabaseError::NoOdbcDriver => write!(f, "No SQL Server ODBC driver is installed"),
            DatabaseError::OdbcDisabled => write!(f, "Built without the `odbc` feature"),
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<tiberius::error::Error> for DatabaseError {
    fn from(err: tiberius::error::Error) -> Self {
        DatabaseError::QueryFailed(err.to_string())
    }
}

#[derive(Debug)]
pub enum LoadError {
    IoError(String, std::io::Error),
    CsvError(String),
    NoNameColumn(String),
    NoValidRows(String),
    StockOutOfRange {
        source: String,
        line: u64,
        value: f64,
    },
    Database(DatabaseError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::IoError(path, e) => write!(f, "IO error on {}: {}", path, e),
            LoadError::CsvError(e) => write!(f, "CSV error: {}", e),
            LoadError::NoNameColumn(path) => {
                write!(f, "No valid product name column found in {}", path)
            }
            LoadError::NoValidRows(path) => write!(f, "No valid rows to insert from {}", path),
            LoadError::StockOutOfRange {
                source,
                line,
                value,
            } => write!(
                f,
                "Stock quantity {} on line {} of {} does not fit an INT column",
                value, line, source
            ),
            LoadError::Database(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::CsvError(err.to_string())
    }
}

impl From<DatabaseError> for LoadError {
    fn from(err: DatabaseError) -> Self {
        LoadError::Database(err)
    }
}

#[derive(Debug)]
pub enum ControllerError {
    LifecycleError(LifecycleError),
    DatabaseError(DatabaseError),
    LoadError(LoadError),
    SchemaStep(&'static str, DatabaseError),
    LoadIncomplete { loaded: usize, total: usize },
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::LifecycleError(e) => write!(f, "{}", e),
            ControllerError::DatabaseError(e) => write!(f, "{}", e),
            ControllerError::LoadError(e) => write!(f, "{}", e),
            ControllerError::SchemaStep(step, e) => {
                write!(f, "Schema initialization failed while {}: {}", step, e)
            }
            ControllerError::LoadIncomplete { loaded, total } => {
                write!(f, "Only {}/{} CSV files loaded", loaded, total)
            }
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<LifecycleError> for ControllerError {
    fn from(err: LifecycleError) -> Self {
        ControllerError::LifecycleError(err)
    }
}

impl From<DatabaseError> for ControllerError {
    fn from(err: DatabaseError) -> Self {
        ControllerError::DatabaseError(err)
    }
}

impl From<LoadError> for ControllerError {
    fn from(err: LoadError) -> Self {
        ControllerError::LoadError(err)
    }
}
