use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::{Arc, Mutex};

use tzprobe::backend::{Backend, Connector, ProbeConnection};
use tzprobe::dialect::StorageSemantics;
use tzprobe::probe::{ProbeSettings, TimestampRoundTripProbe};
use tzprobe::types::{BindValue, ProbeRow, ProbeValue, ZoneSpec};
use tzprobe::{DriverError, ProbeError};

static LITERAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"TIMESTAMP '([^']+)' ts\d+\b").unwrap()
});

/// Instant the scripted server reports for LOCALTIMESTAMP
pub fn server_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()
}

/// Client clock used by the probe in tests
pub fn client_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 7, 4, 16, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn zone(value: &str) -> ZoneSpec {
    ZoneSpec::parse(value).unwrap()
}

#[allow(dead_code)]
pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

/// Settings mirroring the binary's defaults
pub fn default_settings() -> ProbeSettings {
    ProbeSettings {
        default_zone: ZoneSpec::parse("Asia/Hong_Kong").unwrap(),
        reference_zone: ZoneSpec::parse("America/New_York").unwrap(),
        session_zone: ZoneSpec::parse("+05:00").unwrap(),
        sample: NaiveDate::from_ymd_opt(2021, 3, 14)
            .unwrap()
            .and_hms_opt(2, 1, 1)
            .unwrap(),
    }
}

#[allow(dead_code)]
pub fn test_probe() -> TimestampRoundTripProbe {
    TimestampRoundTripProbe::new(default_settings()).with_clock(client_now)
}

struct StoredRow {
    created: NaiveDateTime,
    value: Option<NaiveDateTime>,
    remarks: Option<String>,
}

#[derive(Default)]
pub struct ServerState {
    table: Option<Vec<StoredRow>>,
    pub statements: Vec<String>,
    pub fail_on: Option<String>,
    pub refuse_connections: bool,
    pub opened: usize,
    pub closed: usize,
}

/// In-memory stand-in for one database server.
///
/// Timestamp storage follows the dialect's semantics: MySQL-like servers keep
/// UTC and convert through the session zone, the others keep wall clocks.
#[derive(Clone)]
pub struct ScriptedServer {
    backend: Backend,
    state: Arc<Mutex<ServerState>>,
}

#[allow(dead_code)]
impl ScriptedServer {
    pub fn new(backend: Backend) -> Self {
        ScriptedServer {
            backend,
            state: Arc::new(Mutex::new(ServerState::default())),
        }
    }

    /// Fail every statement whose text contains `fragment`
    pub fn fail_on(self, fragment: &str) -> Self {
        self.state.lock().unwrap().fail_on = Some(fragment.to_string());
        self
    }

    pub fn refuse_connections(self) -> Self {
        self.state.lock().unwrap().refuse_connections = true;
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn row_count(&self) -> Option<usize> {
        self.state.lock().unwrap().table.as_ref().map(Vec::len)
    }

    pub fn open_connections(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.opened - state.closed
    }

    pub fn connections_opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    /// A raw connection, as a connector would hand out
    pub fn connection(&self) -> ScriptedConnection {
        self.state.lock().unwrap().opened += 1;
        ScriptedConnection {
            backend: self.backend,
            state: Arc::clone(&self.state),
            session_zone: ZoneSpec::parse("UTC").unwrap(),
        }
    }
}

#[async_trait]
impl Connector for ScriptedServer {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn connect(&self) -> Result<Box<dyn ProbeConnection>, ProbeError> {
        if self.state.lock().unwrap().refuse_connections {
            return Err(ProbeError::Connection {
                backend: self.backend,
                source: DriverError::Backend("connection refused".to_string()),
            });
        }
        Ok(Box::new(self.connection()))
    }
}

pub struct ScriptedConnection {
    backend: Backend,
    state: Arc<Mutex<ServerState>>,
    session_zone: ZoneSpec,
}

fn render(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

impl ScriptedConnection {
    fn record(&self, sql: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        match &state.fail_on {
            Some(fragment) if sql.contains(fragment.as_str()) => {
                Err(DriverError::Backend(format!("scripted failure: {sql}")))
            }
            _ => Ok(()),
        }
    }

    fn semantics(&self) -> StorageSemantics {
        self.dialect().timestamp_semantics()
    }

    fn store(&self, wall_clock: NaiveDateTime) -> NaiveDateTime {
        match self.semantics() {
            StorageSemantics::SessionNormalized => self.session_zone.resolve(wall_clock).naive_utc(),
            StorageSemantics::WallClock => wall_clock,
        }
    }

    fn load(&self, stored: NaiveDateTime) -> NaiveDateTime {
        match self.semantics() {
            StorageSemantics::SessionNormalized => {
                self.session_zone.to_zoned(stored.and_utc()).naive_local()
            }
            StorageSemantics::WallClock => stored,
        }
    }

    fn local_now(&self) -> NaiveDateTime {
        self.session_zone.to_zoned(server_now()).naive_local()
    }

    fn column_name(&self, name: &str) -> String {
        match self.backend {
            Backend::Oracle => name.to_uppercase(),
            Backend::MySql | Backend::Postgres => name.to_string(),
        }
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed += 1;
        }
    }
}

#[async_trait]
impl ProbeConnection for ScriptedConnection {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn execute(&mut self, sql: &str, params: &[BindValue]) -> Result<u64, DriverError> {
        self.record(sql)?;
        let upper = sql.trim_start().to_uppercase();

        if upper.starts_with("DROP") || upper.starts_with("BEGIN") {
            self.state.lock().unwrap().table = None;
            return Ok(0);
        }
        if upper.starts_with("CREATE TABLE") {
            self.state.lock().unwrap().table = Some(Vec::new());
            return Ok(0);
        }
        if upper.starts_with("INSERT") {
            let value = match params.first() {
                Some(BindValue::Timestamp(ts)) => Some(self.store(*ts)),
                _ => None,
            };
            let remarks = match params.get(1) {
                Some(BindValue::Text(text)) => Some(text.clone()),
                _ => None,
            };
            let created = self.store(self.local_now());
            let mut state = self.state.lock().unwrap();
            let table = state
                .table
                .as_mut()
                .ok_or_else(|| DriverError::Backend("table or view does not exist".to_string()))?;
            table.push(StoredRow {
                created,
                value,
                remarks,
            });
            return Ok(1);
        }
        Ok(0)
    }

    async fn query(&mut self, sql: &str, params: &[BindValue]) -> Result<Vec<ProbeRow>, DriverError> {
        self.record(sql)?;

        if sql.contains("FROM timestamp_test") {
            let state = self.state.lock().unwrap();
            let table = state
                .table
                .as_ref()
                .ok_or_else(|| DriverError::Backend("table or view does not exist".to_string()))?;
            return Ok(table
                .iter()
                .map(|stored| {
                    let created = self.load(stored.created);
                    let value = stored.value.map(|ts| self.load(ts));
                    let mut row = ProbeRow::default();
                    row.push(self.column_name("created_timestamp"), ProbeValue::Timestamp(Some(created)));
                    row.push(self.column_name("created_timestamp_str"), ProbeValue::Text(Some(render(&created))));
                    row.push(self.column_name("timestamp_val"), ProbeValue::Timestamp(value));
                    row.push(self.column_name("timestamp_val_str"), ProbeValue::Text(value.as_ref().map(render)));
                    row.push(self.column_name("remarks"), ProbeValue::Text(stored.remarks.clone()));
                    row.push(self.column_name("retrieved"), ProbeValue::Text(Some(render(&self.local_now()))));
                    row
                })
                .collect());
        }

        if sql.contains("TIMESTAMP '") {
            let mut row = ProbeRow::default();
            for (i, caps) in LITERAL_PATTERN.captures_iter(sql).enumerate() {
                let literal = NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d %H:%M:%S%.f")
                    .map_err(|e| DriverError::Backend(format!("bad literal: {e}")))?;
                row.push(self.column_name(&format!("ts{}", i + 1)), ProbeValue::Timestamp(Some(literal)));
                row.push(self.column_name(&format!("ts{}_str", i + 1)), ProbeValue::Text(Some(render(&literal))));
            }
            return Ok(vec![row]);
        }

        // Bound select: every parameter comes back as text
        let mut row = ProbeRow::default();
        for (i, param) in params.iter().enumerate() {
            let text = match param {
                BindValue::Timestamp(ts) => render(ts),
                BindValue::Text(text) => text.clone(),
            };
            row.push(self.column_name(&format!("col{}", i + 1)), ProbeValue::Text(Some(text)));
        }
        Ok(vec![row])
    }

    async fn set_session_zone(&mut self, zone: &ZoneSpec) -> Result<(), DriverError> {
        let sql = self.dialect().set_session_zone(zone);
        self.record(&sql)?;
        self.session_zone = *zone;
        Ok(())
    }
}
