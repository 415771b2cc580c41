use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error};

use super::{Backend, Connector, ProbeConnection};
use crate::types::{BindValue, ProbeRow, ProbeValue};
use crate::{DriverError, ProbeError};

pub struct PostgresConnector {
    conninfo: String,
}

impl PostgresConnector {
    pub fn new(conninfo: String) -> Self {
        PostgresConnector { conninfo }
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn connect(&self) -> Result<Box<dyn ProbeConnection>, ProbeError> {
        let (client, connection) = tokio_postgres::connect(&self.conninfo, NoTls)
            .await
            .map_err(|e| ProbeError::Connection {
                backend: Backend::Postgres,
                source: e.into(),
            })?;

        // The connection task ends once the client is dropped
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Box::new(PostgresConnection { client }))
    }
}

pub struct PostgresConnection {
    client: Client,
}

fn to_sql_params(params: &[BindValue]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|param| match param {
            BindValue::Timestamp(ts) => ts as &(dyn ToSql + Sync),
            BindValue::Text(text) => text as &(dyn ToSql + Sync),
        })
        .collect()
}

/// `Some(true)` for zone-less timestamps, `Some(false)` for text, `None` otherwise
fn is_timestamp_type(ty: &Type) -> Option<bool> {
    match *ty {
        Type::TIMESTAMP => Some(true),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => Some(false),
        _ => None,
    }
}

fn decode_row(row: &Row) -> Result<ProbeRow, DriverError> {
    let mut decoded = ProbeRow::default();
    for (i, column) in row.columns().iter().enumerate() {
        let value = match is_timestamp_type(column.type_()) {
            Some(true) => ProbeValue::Timestamp(row.try_get::<_, Option<NaiveDateTime>>(i)?),
            Some(false) => ProbeValue::Text(row.try_get::<_, Option<String>>(i)?),
            None => {
                return Err(DriverError::decode(
                    column.name(),
                    format!("unsupported PostgreSQL type {}", column.type_()),
                ));
            }
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

#[async_trait]
impl ProbeConnection for PostgresConnection {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn execute(&mut self, sql: &str, params: &[BindValue]) -> Result<u64, DriverError> {
        debug!("PostgreSQL execute: {}", sql);
        if params.is_empty() {
            // Simple protocol, SET and DDL need no parameter types
            self.client.batch_execute(sql).await?;
            return Ok(0);
        }
        Ok(self.client.execute(sql, &to_sql_params(params)).await?)
    }

    async fn query(&mut self, sql: &str, params: &[BindValue]) -> Result<Vec<ProbeRow>, DriverError> {
        debug!("PostgreSQL query: {}", sql);
        let rows = self.client.query(sql, &to_sql_params(params)).await?;
        rows.iter().map(decode_row).collect()
    }
}
