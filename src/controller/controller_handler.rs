use log::{debug, info};
use std::path::Path;

use crate::configuration::Config;
use crate::container_management::{
    ContainerManager, ContainerRuntime, DockerCli, Outcome, Report, Verb,
};
use crate::controller::cli::Action;
use crate::controller::console::Console;
use crate::error_handling::types::{ControllerError, DatabaseError, LifecycleError};
use crate::storage::database::READY_MAX_ATTEMPTS;
use crate::storage::types::SchemaSummary;
use crate::storage::{csv_loader, odbc, schema, SqlServerClient};

/// Runs one command-line action against a resolved configuration.
pub struct Controller {
    config: Config,
    console: Console,
}

impl Controller {
    pub fn new(config: Config, console: Console) -> Self {
        Self { config, console }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, action: Action) -> Result<(), ControllerError> {
        debug!("Running {:?}", action);
        match action {
            Action::Start { wait_ready } => {
                self.run_verb(&self.manager(), Verb::Start).await?;
                if wait_ready {
                    self.wait_ready().await;
                }
                Ok(())
            }
            Action::Connect => self.connect().await,
            Action::InitSchema => self.init_schema().await,
            Action::LoadCsv { data_dir } => self.load_csv(&data_dir).await,
            lifecycle => match lifecycle.verb() {
                Some(verb) => self.run_verb(&self.manager(), verb).await,
                None => Ok(()),
            },
        }
    }

    fn manager(&self) -> ContainerManager<'_, DockerCli> {
        ContainerManager::new(DockerCli::new(self.config.runtime.as_str()), &self.config)
    }

    /// Runs a lifecycle verb and prints its report.
    ///
    /// An unreachable runtime is always fatal. Any other failure of a
    /// read-only verb is printed and the invocation still succeeds.
    pub async fn run_verb<R: ContainerRuntime>(
        &self,
        manager: &ContainerManager<'_, R>,
        verb: Verb,
    ) -> Result<(), ControllerError> {
        match manager.run(verb).await {
            Ok(report) => {
                self.render(report);
                Ok(())
            }
            Err(e @ LifecycleError::RuntimeUnreachable(_)) => Err(e.into()),
            Err(e) if verb.is_read_only() => {
                self.console.error(&e.to_string());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn render(&self, report: Report) {
        let name = &self.config.container_name;
        match report {
            Report::Steps(outcomes) => {
                for outcome in outcomes {
                    let message = outcome.describe(name);
                    if outcome.is_noop() {
                        self.console.warning(&message);
                    } else {
                        self.console.success(&message);
                    }
                    if matches!(outcome, Outcome::Started { .. }) {
                        self.print_connection_info();
                    }
                }
            }
            Report::Status(status) => {
                self.console.info("SQL Server container status");
                self.console.print(&status.to_string());
            }
            Report::Logs(Some(text)) => self.console.print(&text),
            Report::Logs(None) => {
                self.console.error(&format!("Container {} does not exist", name));
            }
        }
    }

    fn print_connection_info(&self) {
        self.console.info("Connection details:");
        self.console.print(&format!(
            "  Server:   {}\n  User:     {}\n  Password: {}\n  Database: {}",
            self.config.server(),
            self.config.user,
            self.config.masked_password(),
            self.config.database
        ));
    }

    /// Readiness is advisory: a server that never answers only earns a warning.
    async fn wait_ready(&self) {
        self.console
            .info("Waiting for SQL Server to accept connections...");
        match SqlServerClient::wait_until_ready(&self.config, READY_MAX_ATTEMPTS).await {
            Ok(version) => {
                self.console.success(&format!(
                    "SQL Server is ready: {}",
                    version.lines().next().unwrap_or_default().trim()
                ));
            }
            Err(e) => self.console.warning(&format!(
                "SQL Server is not accepting connections yet: {}",
                e
            )),
        }
    }

    /// Checks both connection paths and reports each one.
    ///
    /// Fails when an attempted path fails; a path not built in is skipped.
    async fn connect(&self) -> Result<(), ControllerError> {
        self.console.info(&format!(
            "Connecting to {} (database {}) as {}",
            self.config.server(),
            self.config.database,
            self.config.user
        ));
        self.list_odbc_drivers().await;

        let tds = self.connect_tds().await;
        match &tds {
            Ok(version) => {
                self.console.success("TDS connection successful");
                self.console.print(version);
            }
            Err(e) => self.console.error(&format!("TDS connection failed: {}", e)),
        }

        let via_odbc = match odbc::server_version(&self.config).await {
            Ok(version) => {
                self.console.success("ODBC connection successful");
                self.console.print(&version);
                Ok(())
            }
            Err(DatabaseError::OdbcDisabled) => {
                self.console
                    .info("ODBC connection skipped: built without the `odbc` feature");
                Ok(())
            }
            Err(e) => {
                self.console.error(&format!("ODBC connection failed: {}", e));
                Err(e)
            }
        };

        tds?;
        via_odbc?;
        Ok(())
    }

    async fn connect_tds(&self) -> Result<String, DatabaseError> {
        let mut client = SqlServerClient::connect(&self.config).await?;
        let version = client.server_version().await;
        client.close().await;
        version
    }

    async fn list_odbc_drivers(&self) {
        match odbc::installed_drivers().await {
            Ok(drivers) if drivers.is_empty() => self.console.warning(
                "No SQL Server ODBC drivers found. Install the Microsoft ODBC Driver for SQL Server",
            ),
            Ok(drivers) => {
                for driver in drivers {
                    self.console.info(&format!("ODBC driver: {}", driver));
                }
            }
            Err(DatabaseError::OdbcDisabled) => {}
            Err(e) => self
                .console
                .warning(&format!("Unable to list ODBC drivers: {}", e)),
        }
    }

    async fn init_schema(&self) -> Result<(), ControllerError> {
        self.console.info("Initializing database schema...");
        let mut client = SqlServerClient::connect(&self.config)
            .await
            .map_err(|e| ControllerError::SchemaStep("connecting", e))?;
        let result = Self::schema_steps(&mut client).await;
        client.close().await;
        let summary = result?;

        self.console.success("Database schema initialized");
        self.console.print(&format!(
            "  Total products: {}\n  Average price:  {}\n  Total stock:    {}",
            summary.total_products,
            summary
                .avg_price
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "-".to_string()),
            summary
                .total_stock
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string())
        ));
        Ok(())
    }

    async fn schema_steps(client: &mut SqlServerClient) -> Result<SchemaSummary, ControllerError> {
        schema::create_products_table(client)
            .await
            .map_err(|e| ControllerError::SchemaStep("creating the products table", e))?;
        schema::insert_sample_data(client)
            .await
            .map_err(|e| ControllerError::SchemaStep("inserting sample data", e))?;
        schema::verify_schema(client)
            .await
            .map_err(|e| ControllerError::SchemaStep("verifying the schema", e))
    }

    async fn load_csv(&self, dir: &Path) -> Result<(), ControllerError> {
        self.console
            .info(&format!("Loading CSV files from {}", dir.display()));
        let summary = csv_loader::load_directory(&self.config, dir).await?;
        info!("Inserted {} rows in total", summary.inserted_rows);

        if !summary.all_loaded() {
            return Err(ControllerError::LoadIncomplete {
                loaded: summary.loaded_files,
                total: summary.total_files,
            });
        }
        self.console.success(&format!(
            "Loaded {}/{} files ({} rows)",
            summary.loaded_files, summary.total_files, summary.inserted_rows
        ));
        Ok(())
    }
}
