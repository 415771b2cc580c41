pub mod backend;
pub mod config;
pub mod dialect;
pub mod error;
pub mod probe;
pub mod types;

use thiserror::Error;

pub use error::DriverError;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Cannot connect to {backend}: {source}")]
    Connection {
        backend: backend::Backend,
        #[source]
        source: DriverError,
    },

    #[error("Schema statement failed: {0}")]
    Schema(#[source] DriverError),

    #[error("Write failed: {0}")]
    Write(#[source] DriverError),

    #[error("Query failed: {0}")]
    Query(#[source] DriverError),

    #[error("Invalid time zone: {0}")]
    InvalidZone(String),

    #[error("Unexpected result shape: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    /// Backend error code (SQLSTATE or ORA- number) of the wrapped driver error, if any
    pub fn backend_code(&self) -> Option<String> {
        match self {
            ProbeError::Connection { source, .. } => source.code(),
            ProbeError::Schema(e) | ProbeError::Write(e) | ProbeError::Query(e) => e.code(),
            ProbeError::InvalidZone(_) | ProbeError::Decode(_) => None,
        }
    }
}
