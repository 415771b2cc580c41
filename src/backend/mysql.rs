use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Row, TypeInfo};
use std::str::FromStr;
use tracing::debug;

use super::{Backend, Connector, ProbeConnection};
use crate::types::{BindValue, ProbeRow, ProbeValue};
use crate::{DriverError, ProbeError};

pub struct MySqlConnector {
    url: String,
}

impl MySqlConnector {
    pub fn new(url: String) -> Self {
        MySqlConnector { url }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    fn backend(&self) -> Backend {
        Backend::MySql
    }

    async fn connect(&self) -> Result<Box<dyn ProbeConnection>, ProbeError> {
        let connection_error = |e: sqlx::Error| ProbeError::Connection {
            backend: Backend::MySql,
            source: e.into(),
        };
        let options = MySqlConnectOptions::from_str(&self.url).map_err(connection_error)?;
        let conn = options.connect().await.map_err(connection_error)?;
        Ok(Box::new(MySqlProbeConnection { conn }))
    }
}

pub struct MySqlProbeConnection {
    conn: MySqlConnection,
}

fn is_timestamp_type(type_name: &str) -> bool {
    matches!(type_name, "TIMESTAMP" | "DATETIME")
}

fn decode_row(row: &MySqlRow) -> Result<ProbeRow, DriverError> {
    let mut decoded = ProbeRow::default();
    for (i, column) in row.columns().iter().enumerate() {
        let value = if is_timestamp_type(column.type_info().name()) {
            ProbeValue::Timestamp(row.try_get::<Option<NaiveDateTime>, _>(i)?)
        } else {
            ProbeValue::Text(row.try_get::<Option<String>, _>(i)?)
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

#[async_trait]
impl ProbeConnection for MySqlProbeConnection {
    fn backend(&self) -> Backend {
        Backend::MySql
    }

    async fn execute(&mut self, sql: &str, params: &[BindValue]) -> Result<u64, DriverError> {
        debug!("MySQL execute: {}", sql);
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                BindValue::Timestamp(ts) => query.bind(*ts),
                BindValue::Text(text) => query.bind(text.as_str()),
            };
        }
        Ok(query.execute(&mut self.conn).await?.rows_affected())
    }

    async fn query(&mut self, sql: &str, params: &[BindValue]) -> Result<Vec<ProbeRow>, DriverError> {
        debug!("MySQL query: {}", sql);
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                BindValue::Timestamp(ts) => query.bind(*ts),
                BindValue::Text(text) => query.bind(text.as_str()),
            };
        }
        let rows = query.fetch_all(&mut self.conn).await?;
        rows.iter().map(decode_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_type_names() {
        assert!(is_timestamp_type("TIMESTAMP"));
        assert!(is_timestamp_type("DATETIME"));
        assert!(!is_timestamp_type("VARCHAR"));
        assert!(!is_timestamp_type("CHAR"));
    }
}
