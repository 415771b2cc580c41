use ::oracle::sql_type::{OracleType, ToSql};
use ::oracle::Connection;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::debug;

use super::{Backend, Connector, ProbeConnection};
use crate::types::{BindValue, ProbeRow, ProbeValue};
use crate::{DriverError, ProbeError};

/// Session settings applied on connect so text casts of timestamps are ISO-shaped
const SESSION_SETUP: [&str; 2] = [
    "ALTER SESSION SET NLS_TIMESTAMP_FORMAT = 'YYYY-MM-DD HH24:MI:SS.FF'",
    "ALTER SESSION SET NLS_TIMESTAMP_TZ_FORMAT = 'YYYY-MM-DD HH24:MI:SS.FF TZH:TZM'",
];

pub struct OracleConnector {
    user: String,
    password: String,
    connect_string: String,
}

impl OracleConnector {
    pub fn new(user: String, password: String, connect_string: String) -> Self {
        OracleConnector {
            user,
            password,
            connect_string,
        }
    }
}

fn open(user: &str, password: &str, connect_string: &str) -> Result<Connection, DriverError> {
    let mut conn = Connection::connect(user, password, connect_string)?;
    conn.set_autocommit(true);
    for sql in SESSION_SETUP {
        conn.execute(sql, &[])?;
    }
    Ok(conn)
}

#[async_trait]
impl Connector for OracleConnector {
    fn backend(&self) -> Backend {
        Backend::Oracle
    }

    async fn connect(&self) -> Result<Box<dyn ProbeConnection>, ProbeError> {
        let (user, password, connect_string) =
            (self.user.clone(), self.password.clone(), self.connect_string.clone());
        let conn = tokio::task::spawn_blocking(move || open(&user, &password, &connect_string))
            .await
            .map_err(DriverError::from)
            .and_then(|opened| opened)
            .map_err(|source| ProbeError::Connection {
                backend: Backend::Oracle,
                source,
            })?;
        Ok(Box::new(OracleProbeConnection {
            conn: Arc::new(conn),
        }))
    }
}

/// The driver is blocking, every call runs on the blocking pool
pub struct OracleProbeConnection {
    conn: Arc<Connection>,
}

fn is_timestamp_type(oracle_type: &OracleType) -> bool {
    matches!(
        oracle_type,
        OracleType::Date | OracleType::Timestamp(_) | OracleType::TimestampLTZ(_)
    )
}

fn to_sql_params(params: &[BindValue]) -> Vec<&dyn ToSql> {
    params
        .iter()
        .map(|param| match param {
            BindValue::Timestamp(ts) => ts as &dyn ToSql,
            BindValue::Text(text) => text as &dyn ToSql,
        })
        .collect()
}

fn run_query(conn: &Connection, sql: &str, params: &[BindValue]) -> Result<Vec<ProbeRow>, DriverError> {
    let result_set = conn.query(sql, &to_sql_params(params))?;
    let columns: Vec<(String, bool)> = result_set
        .column_info()
        .iter()
        .map(|info| (info.name().to_string(), is_timestamp_type(info.oracle_type())))
        .collect();

    let mut rows = Vec::new();
    for row in result_set {
        let row = row?;
        let mut decoded = ProbeRow::default();
        for (i, (name, is_timestamp)) in columns.iter().enumerate() {
            let value = if *is_timestamp {
                ProbeValue::Timestamp(row.get::<_, Option<NaiveDateTime>>(i)?)
            } else {
                ProbeValue::Text(row.get::<_, Option<String>>(i)?)
            };
            decoded.push(name.as_str(), value);
        }
        rows.push(decoded);
    }
    Ok(rows)
}

#[async_trait]
impl ProbeConnection for OracleProbeConnection {
    fn backend(&self) -> Backend {
        Backend::Oracle
    }

    async fn execute(&mut self, sql: &str, params: &[BindValue]) -> Result<u64, DriverError> {
        debug!("Oracle execute: {}", sql);
        let conn = Arc::clone(&self.conn);
        let (sql, params) = (sql.to_string(), params.to_vec());
        tokio::task::spawn_blocking(move || -> Result<u64, DriverError> {
            let stmt = conn.execute(&sql, &to_sql_params(&params))?;
            Ok(stmt.row_count()?)
        })
        .await?
    }

    async fn query(&mut self, sql: &str, params: &[BindValue]) -> Result<Vec<ProbeRow>, DriverError> {
        debug!("Oracle query: {}", sql);
        let conn = Arc::clone(&self.conn);
        let (sql, params) = (sql.to_string(), params.to_vec());
        tokio::task::spawn_blocking(move || run_query(&conn, &sql, &params)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_types() {
        assert!(is_timestamp_type(&OracleType::Timestamp(6)));
        assert!(is_timestamp_type(&OracleType::Date));
        assert!(!is_timestamp_type(&OracleType::Varchar2(30)));
        assert!(!is_timestamp_type(&OracleType::TimestampTZ(6)));
    }
}
