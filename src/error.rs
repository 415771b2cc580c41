use thiserror::Error;

/// Failures raised by the database client libraries, unified across backends
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("MySQL error: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("Oracle error: {0}")]
    Oracle(#[from] oracle::Error),

    #[error("Blocking driver task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Cannot decode column {column}: {message}")]
    Decode { column: String, message: String },

    #[error("{0}")]
    Backend(String),
}

impl DriverError {
    /// Get the backend error code for this error
    ///
    /// PostgreSQL and MySQL report a SQLSTATE, Oracle an `ORA-nnnnn` number.
    pub fn code(&self) -> Option<String> {
        match self {
            DriverError::Postgres(e) => e.as_db_error().map(|db| db.code().code().to_string()),
            DriverError::MySql(e) => e
                .as_database_error()
                .and_then(|db| db.code())
                .map(|code| code.into_owned()),
            DriverError::Oracle(e) => e.db_error().map(|db| format!("ORA-{:05}", db.code())),
            DriverError::Join(_) | DriverError::Decode { .. } | DriverError::Backend(_) => None,
        }
    }

    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        DriverError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_has_no_code() {
        let err = DriverError::decode("timestamp_val", "unexpected type");
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Cannot decode column timestamp_val: unexpected type");
    }

    #[test]
    fn test_backend_error_message_is_passed_through() {
        let err = DriverError::Backend("table or view does not exist".to_string());
        assert_eq!(err.to_string(), "table or view does not exist");
        assert!(err.code().is_none());
    }
}
