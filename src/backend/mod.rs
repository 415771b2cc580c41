pub mod mysql;
pub mod oracle;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::config::Config;
use crate::dialect::Dialect;
use crate::types::{BindValue, ProbeRow, ZoneSpec};
use crate::{DriverError, ProbeError};

pub use self::mysql::MySqlConnector;
pub use self::oracle::OracleConnector;
pub use self::postgres::PostgresConnector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[value(name = "mysql")]
    MySql,
    Oracle,
    Postgres,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::MySql, Backend::Oracle, Backend::Postgres];
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::MySql => "MySQL",
            Backend::Oracle => "Oracle",
            Backend::Postgres => "PostgreSQL",
        };
        f.write_str(name)
    }
}

/// An open session on one backend
#[async_trait]
pub trait ProbeConnection: Send {
    fn backend(&self) -> Backend;

    fn dialect(&self) -> Dialect {
        Dialect::for_backend(self.backend())
    }

    /// Run a statement that returns no rows, returning the affected row count
    async fn execute(&mut self, sql: &str, params: &[BindValue]) -> Result<u64, DriverError>;

    async fn query(&mut self, sql: &str, params: &[BindValue]) -> Result<Vec<ProbeRow>, DriverError>;

    async fn set_session_zone(&mut self, zone: &ZoneSpec) -> Result<(), DriverError> {
        let sql = self.dialect().set_session_zone(zone);
        debug!("Setting session zone: {}", sql);
        self.execute(&sql, &[]).await.map(|_| ())
    }
}

/// Supplies fresh connections for one backend
#[async_trait]
pub trait Connector: Send + Sync {
    fn backend(&self) -> Backend;

    async fn connect(&self) -> Result<Box<dyn ProbeConnection>, ProbeError>;
}

/// Build the connector for `backend` from the configured endpoints
pub fn connector_for(backend: Backend, config: &Config) -> Box<dyn Connector> {
    match backend {
        Backend::MySql => Box::new(MySqlConnector::new(config.mysql_url.clone())),
        Backend::Oracle => Box::new(OracleConnector::new(
            config.oracle_user.clone(),
            config.oracle_password.clone(),
            config.oracle_connect_string.clone(),
        )),
        Backend::Postgres => Box::new(PostgresConnector::new(config.postgres_url.clone())),
    }
}
