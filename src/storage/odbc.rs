//! Alternate connectivity check through the host's ODBC driver manager.
//!
//! The driver calls are blocking and only compiled with the `odbc` feature,
//! since they link against the system's unixODBC or Windows ODBC library.
//! Without it both checks report [`DatabaseError::OdbcDisabled`].

use log::info;

use crate::configuration::Config;
use crate::error_handling::types::DatabaseError;

pub const PREFERRED_DRIVER: &str = "ODBC Driver 18 for SQL Server";

/// Keeps the driver names that mention SQL Server.
pub fn sql_server_drivers<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(Into::into)
        .filter(|name| name.contains("SQL Server"))
        .collect()
}

/// The preferred driver when installed, otherwise the highest-sorting one.
pub fn choose_driver(drivers: &[String]) -> Option<&str> {
    drivers
        .iter()
        .find(|d| d.as_str() == PREFERRED_DRIVER)
        .or_else(|| drivers.iter().max())
        .map(String::as_str)
}

// Braced so `;` and `}` inside values survive.
fn braced(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}

pub fn connection_string(config: &Config, driver: &str) -> String {
    format!(
        "DRIVER={};SERVER={};DATABASE={};UID={};PWD={};TrustServerCertificate=yes;Connection Timeout=30;",
        braced(driver),
        config.server(),
        braced(&config.database),
        braced(&config.user),
        braced(&config.password)
    )
}

/// SQL Server drivers registered with the driver manager.
pub async fn installed_drivers() -> Result<Vec<String>, DatabaseError> {
    let drivers = blocking(driver::installed_drivers).await?;
    info!("Available SQL Server ODBC drivers: {:?}", drivers);
    Ok(drivers)
}

/// Connects through ODBC and returns `SELECT @@VERSION`.
pub async fn server_version(config: &Config) -> Result<String, DatabaseError> {
    let config = config.clone();
    blocking(move || driver::server_version(&config)).await
}

async fn blocking<T, F>(f: F) -> Result<T, DatabaseError>
where
    F: FnOnce() -> Result<T, DatabaseError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(format!("ODBC worker failed: {}", e)))?
}

#[cfg(feature = "odbc")]
mod driver {
    use log::debug;
    use odbc_api::{ConnectionOptions, Cursor, Environment};

    use super::{choose_driver, connection_string, sql_server_drivers};
    use crate::configuration::Config;
    use crate::error_handling::types::DatabaseError;

    fn connection_failed(e: odbc_api::Error) -> DatabaseError {
        DatabaseError::ConnectionFailed(e.to_string())
    }

    fn query_failed(e: odbc_api::Error) -> DatabaseError {
        DatabaseError::QueryFailed(e.to_string())
    }

    fn drivers_of(env: &Environment) -> Result<Vec<String>, DatabaseError> {
        let drivers = env.drivers().map_err(connection_failed)?;
        Ok(sql_server_drivers(drivers.into_iter().map(|d| d.description)))
    }

    pub fn installed_drivers() -> Result<Vec<String>, DatabaseError> {
        let env = Environment::new().map_err(connection_failed)?;
        drivers_of(&env)
    }

    pub fn server_version(config: &Config) -> Result<String, DatabaseError> {
        let env = Environment::new().map_err(connection_failed)?;
        let drivers = drivers_of(&env)?;
        let driver = choose_driver(&drivers).ok_or(DatabaseError::NoOdbcDriver)?;
        debug!("Connecting over ODBC with {}", driver);

        let connection = env
            .connect_with_connection_string(
                &connection_string(config, driver),
                ConnectionOptions::default(),
            )
            .map_err(connection_failed)?;
        let mut statement = connection.prepare("SELECT @@VERSION").map_err(query_failed)?;
        let empty = || DatabaseError::EmptyResult("SELECT @@VERSION".to_string());

        let mut cursor = statement.execute(()).map_err(query_failed)?.ok_or_else(empty)?;
        let mut row = cursor.next_row().map_err(query_failed)?.ok_or_else(empty)?;
        let mut buffer = Vec::new();
        row.get_text(1, &mut buffer).map_err(query_failed)?;

        let version = String::from_utf8_lossy(&buffer).into_owned();
        Ok(version)
    }
}

#[cfg(not(feature = "odbc"))]
mod driver {
    use crate::configuration::Config;
    use crate::error_handling::types::DatabaseError;

    pub fn installed_drivers() -> Result<Vec<String>, DatabaseError> {
        Err(DatabaseError::OdbcDisabled)
    }

    pub fn server_version(_config: &Config) -> Result<String, DatabaseError> {
        Err(DatabaseError::OdbcDisabled)
    }
}
