use serde::Deserialize;

pub const DEFAULT_USER: &str = "sa";
// Demo credential, never use it outside a throwaway container.
pub const DEFAULT_PASSWORD: &str = "YourStrong@Passw0rd";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "1433";
pub const DEFAULT_DATABASE: &str = "master";
pub const DEFAULT_IMAGE: &str = "mcr.microsoft.com/mssql/server:2022-latest";
pub const DEFAULT_CONTAINER_NAME: &str = "sqlserver-demo";
pub const DEFAULT_RUNTIME: &str = "docker";
pub const DEFAULT_PLATFORM: &str = "linux/amd64";
pub const DEFAULT_SETTLE_SECS: u64 = 10;

/// Settings file name looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "sqlctl.toml";

/// Raw contents of the optional TOML settings file.
///
/// Every key is optional; absent keys fall through to the defaults above.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub database: Option<String>,
    pub image: Option<String>,
    pub container_name: Option<String>,
    pub runtime: Option<String>,
    pub platform: Option<String>,
    pub settle_secs: Option<u64>,
}
