use log::{debug, info};
use std::time::Duration;

use tiberius::{AuthMethod, Client, Row, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::configuration::Config;
use crate::error_handling::types::DatabaseError;

/// Upper bound for establishing a connection, TCP and login included.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts made by [`SqlServerClient::wait_until_ready`].
pub const READY_MAX_ATTEMPTS: u32 = 30;

const READY_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the driver configuration from the connection parameters.
///
/// This is where `port` is first interpreted as a number. The server
/// certificate is trusted as-is since the container ships a self-signed one.
pub fn tds_config(config: &Config) -> Result<tiberius::Config, DatabaseError> {
    let port: u16 = config
        .port
        .trim()
        .parse()
        .map_err(|_| DatabaseError::InvalidPort(config.port.clone()))?;

    let mut tds = tiberius::Config::new();
    tds.host(&config.host);
    tds.port(port);
    tds.database(&config.database);
    tds.application_name("sqlctl");
    tds.authentication(AuthMethod::sql_server(&config.user, &config.password));
    tds.trust_cert();
    Ok(tds)
}

/// Delay before the next readiness attempt: 700ms, 900ms, ... capped at 3s.
pub fn readiness_backoff(attempt: u32) -> Duration {
    let millis = 500 + u64::from(attempt) * 200;
    Duration::from_millis(millis.min(3000))
}

/// A single authenticated connection to SQL Server.
pub struct SqlServerClient {
    client: Client<Compat<TcpStream>>,
}

impl SqlServerClient {
    pub async fn connect(config: &Config) -> Result<Self, DatabaseError> {
        Self::connect_with_timeout(config, CONNECT_TIMEOUT).await
    }

    pub async fn connect_with_timeout(
        config: &Config,
        limit: Duration,
    ) -> Result<Self, DatabaseError> {
        let tds = tds_config(config)?;
        let addr = tds.get_addr();
        debug!("Connecting to SQL Server at {}", addr);

        let attempt = async {
            let tcp = TcpStream::connect(&addr)
                .await
                .map_err(|e| DatabaseError::ConnectionFailed(format!("{}: {}", addr, e)))?;
            tcp.set_nodelay(true)
                .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
            Client::connect(tds, tcp.compat_write())
                .await
                .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
        };

        let client = tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| DatabaseError::Timeout(limit))??;

        debug!("Connected to {}", addr);
        Ok(Self { client })
    }

    /// Retries connecting until a `SELECT @@VERSION` round trip succeeds.
    ///
    /// Returns the server version string. An unparseable port fails at once.
    pub async fn wait_until_ready(
        config: &Config,
        max_attempts: u32,
    ) -> Result<String, DatabaseError> {
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let result = match Self::connect_with_timeout(config, READY_ATTEMPT_TIMEOUT).await {
                Ok(mut client) => {
                    let version = client.server_version().await;
                    client.close().await;
                    version
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(version) => {
                    info!("SQL Server accepted a connection after {} attempt(s)", attempt);
                    return Ok(version);
                }
                Err(DatabaseError::InvalidPort(port)) => {
                    return Err(DatabaseError::InvalidPort(port))
                }
                Err(e) => {
                    let wait = readiness_backoff(attempt);
                    debug!(
                        "Readiness attempt {}/{} failed: {} - retrying in {}ms",
                        attempt,
                        max_attempts,
                        e,
                        wait.as_millis()
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DatabaseError::ConnectionFailed("no connection attempt was made".to_string())
        }))
    }

    pub async fn server_version(&mut self) -> Result<String, DatabaseError> {
        let row = self
            .client
            .query("SELECT @@VERSION", &[])
            .await?
            .into_row()
            .await?;

        row.and_then(|r| {
            r.try_get::<&str, _>(0)
                .ok()
                .flatten()
                .map(|s| s.to_string())
        })
        .ok_or_else(|| DatabaseError::EmptyResult("SELECT @@VERSION".to_string()))
    }

    /// Runs a parameterized statement and returns the affected row count.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<u64, DatabaseError> {
        let result = self.client.execute(sql, params).await?;
        let affected = result.total();
        debug!("Executed {} ({} rows)", preview(sql), affected);
        Ok(affected)
    }

    /// Runs a parameterized query and returns the rows of its first result set.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Row>, DatabaseError> {
        let rows = self
            .client
            .query(sql, params)
            .await?
            .into_first_result()
            .await?;
        debug!("Query {} returned {} rows", preview(sql), rows.len());
        Ok(rows)
    }

    /// Sends a raw batch. Used for DDL and transaction control.
    pub async fn batch(&mut self, sql: &str) -> Result<(), DatabaseError> {
        self.client.simple_query(sql).await?.into_results().await?;
        debug!("Batch {} completed", preview(sql));
        Ok(())
    }

    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            debug!("Error while closing connection: {}", e);
        }
    }
}

fn preview(sql: &str) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > 50 {
        format!("{}...", flat.chars().take(50).collect::<String>())
    } else {
        flat
    }
}
