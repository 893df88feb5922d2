use super::types::*;
use crate::error_handling::types::ConfigError;
use log::debug;
use std::path::Path;

/// Connection and container parameters for a single invocation.
///
/// Built once at process start and handed out by reference; nothing mutates it
/// afterwards. Values are taken as-is: `port` in particular stays a string and
/// is only parsed by the consumers that need a number.
///
/// # Sources
///
/// For every key the first available source wins:
/// 1. the environment variable (e.g. `SQL_PORT`), when non-empty
/// 2. the TOML settings file
/// 3. the built-in default
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub database: String,
    pub image: String,
    pub container_name: String,
    /// Binary of a docker-compatible CLI, e.g. `docker` or `podman`.
    pub runtime: String,
    pub platform: String,
    /// Upper bound on the wait for a started container to report running.
    pub settle_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            runtime: DEFAULT_RUNTIME.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            settle_secs: DEFAULT_SETTLE_SECS,
        }
    }
}

impl Config {
    /// Loads the configuration from the process environment and a settings file.
    ///
    /// With `path` set the file must exist. Without it, `sqlctl.toml` in the
    /// working directory is read when present and skipped otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(p) => FileSettings::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_SETTINGS_FILE);
                if default_path.is_file() {
                    FileSettings::from_file(default_path)?
                } else {
                    debug!("No {} found, using environment and defaults", DEFAULT_SETTINGS_FILE);
                    FileSettings::default()
                }
            }
        };

        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    /// Merges `settings` with the variables returned by `env`.
    pub fn resolve<F>(settings: FileSettings, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |var: &str, file: Option<String>, default: &str| -> String {
            env(var)
                .filter(|v| !v.is_empty())
                .or(file)
                .unwrap_or_else(|| default.to_string())
        };

        let settle_secs = match env("SQL_SETTLE_SECS").filter(|v| !v.is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue("SQL_SETTLE_SECS".to_string(), raw))?,
            None => settings.settle_secs.unwrap_or(DEFAULT_SETTLE_SECS),
        };

        Ok(Self {
            user: pick("SQL_USER", settings.user, DEFAULT_USER),
            password: pick("SQL_PASSWORD", settings.password, DEFAULT_PASSWORD),
            host: pick("SQL_SERVER", settings.host, DEFAULT_HOST),
            port: pick("SQL_PORT", settings.port, DEFAULT_PORT),
            database: pick("SQL_DB", settings.database, DEFAULT_DATABASE),
            image: pick("SQL_IMAGE", settings.image, DEFAULT_IMAGE),
            container_name: pick(
                "SQL_CONTAINER_NAME",
                settings.container_name,
                DEFAULT_CONTAINER_NAME,
            ),
            runtime: pick("CONTAINER_RUNTIME", settings.runtime, DEFAULT_RUNTIME),
            platform: pick("SQL_PLATFORM", settings.platform, DEFAULT_PLATFORM),
            settle_secs,
        })
    }

    /// `host,port` in the form SQL Server tools expect.
    pub fn server(&self) -> String {
        format!("{},{}", self.host, self.port)
    }

    pub fn masked_password(&self) -> String {
        "*".repeat(self.password.chars().count().min(8))
    }
}

impl FileSettings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(display.clone())
            } else {
                ConfigError::IoError(display.clone(), e)
            }
        })?;
        debug!("Read settings from {}", display);
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}
