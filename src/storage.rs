//! Storage subsystem
//!
//! Talks to the SQL Server instance running in the managed container.
//!
//! Components:
//! - `database`: connection setup, readiness polling and query helpers over `tiberius`.
//! - `odbc`: the alternate connection check through the host's ODBC driver manager.
//! - `schema`: the fixed `products` DDL, sample data and verification query.
//! - `csv_loader`: CSV discovery, column mapping and row-by-row insertion.
//! - `types`: rows and summaries shared by the above.

pub mod csv_loader;
pub mod database;
pub mod odbc;
pub mod schema;
pub mod types;

pub use database::SqlServerClient;
