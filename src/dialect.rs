use chrono::NaiveDateTime;
use serde::Serialize;

use crate::backend::Backend;
use crate::types::{format_wall_clock, ZoneSpec};

/// Name of the scratch table the probe owns
pub const TABLE_NAME: &str = "timestamp_test";

/// What a backend does with a plain `TIMESTAMP` column value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageSemantics {
    /// Converted from the session zone to UTC on write and back to the session zone on read
    SessionNormalized,
    /// Wall-clock fields are stored and returned untouched
    WallClock,
}

/// Per-backend SQL fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    backend: Backend,
}

impl Dialect {
    pub fn for_backend(backend: Backend) -> Self {
        Dialect { backend }
    }

    pub fn timestamp_semantics(&self) -> StorageSemantics {
        match self.backend {
            Backend::MySql => StorageSemantics::SessionNormalized,
            Backend::Oracle | Backend::Postgres => StorageSemantics::WallClock,
        }
    }

    pub fn drop_table(&self) -> String {
        match self.backend {
            Backend::Oracle => format!(
                "BEGIN \
                   FOR i IN (SELECT 1 FROM user_tables WHERE table_name = '{upper}') LOOP \
                     EXECUTE IMMEDIATE 'DROP TABLE {upper} CASCADE CONSTRAINTS PURGE'; \
                   END LOOP; \
                 END;",
                upper = TABLE_NAME.to_uppercase()
            ),
            Backend::MySql | Backend::Postgres => {
                format!("DROP TABLE IF EXISTS {TABLE_NAME} CASCADE")
            }
        }
    }

    pub fn create_table(&self) -> String {
        let remarks = match self.backend {
            Backend::Oracle => "VARCHAR2(200 CHAR) NULL",
            Backend::MySql | Backend::Postgres => "VARCHAR(200)",
        };
        format!(
            "CREATE TABLE {TABLE_NAME} (\
             created_timestamp TIMESTAMP NOT NULL, \
             timestamp_val TIMESTAMP NULL, \
             remarks {remarks})"
        )
    }

    /// Wrap an expression in a cast to the backend's text type
    pub fn text_cast(&self, expr: &str) -> String {
        let target = match self.backend {
            Backend::MySql => "CHAR",
            Backend::Oracle => "VARCHAR2(64 CHAR)",
            Backend::Postgres => "VARCHAR",
        };
        format!("CAST({expr} AS {target})")
    }

    /// Suffix for selects that read no table
    pub fn from_dual(&self) -> &'static str {
        match self.backend {
            Backend::Oracle => " FROM DUAL",
            Backend::MySql | Backend::Postgres => "",
        }
    }

    /// Bind placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self.backend {
            Backend::MySql => "?".to_string(),
            Backend::Oracle => format!(":{index}"),
            Backend::Postgres => format!("${index}"),
        }
    }

    /// Placeholder whose type the server must infer as a timestamp
    pub fn timestamp_placeholder(&self, index: usize) -> String {
        match self.backend {
            Backend::Postgres => format!("CAST(${index} AS TIMESTAMP)"),
            Backend::MySql | Backend::Oracle => self.placeholder(index),
        }
    }

    /// Zone literal as the backend's session setting understands it
    ///
    /// PostgreSQL reads a string such as `'+05:00'` as a POSIX zone, where the
    /// sign is inverted, so fixed offsets are given as ISO hour numbers instead.
    pub fn session_zone_literal(&self, zone: &ZoneSpec) -> String {
        match (self.backend, zone) {
            (Backend::Postgres, ZoneSpec::Fixed(offset)) => {
                let seconds = offset.local_minus_utc();
                if seconds % 3600 == 0 {
                    format!("{:+03}", seconds / 3600)
                } else {
                    format!("{:+}", seconds as f64 / 3600.0)
                }
            }
            _ => zone.to_string(),
        }
    }

    pub fn set_session_zone(&self, zone: &ZoneSpec) -> String {
        let literal = self.session_zone_literal(zone);
        match self.backend {
            Backend::MySql => format!("SET time_zone = '{literal}'"),
            Backend::Oracle => format!("ALTER SESSION SET TIME_ZONE = '{literal}'"),
            Backend::Postgres => format!("SET TIMEZONE='{literal}'"),
        }
    }

    /// Insert with a server-side creation time; binds the value then the remark
    pub fn insert_sample(&self) -> String {
        format!(
            "INSERT INTO {TABLE_NAME} (created_timestamp, timestamp_val, remarks) \
             VALUES (LOCALTIMESTAMP, {}, {})",
            self.placeholder(1),
            self.placeholder(2)
        )
    }

    pub fn select_rows(&self) -> String {
        format!(
            "SELECT created_timestamp, \
             {} created_timestamp_str, \
             timestamp_val, {} timestamp_val_str, \
             remarks, \
             {} retrieved \
             FROM {TABLE_NAME}",
            self.text_cast("created_timestamp"),
            self.text_cast("timestamp_val"),
            self.text_cast("LOCALTIMESTAMP")
        )
    }

    /// Three-parameter select reading back a timestamp and two strings as text
    pub fn select_bound(&self) -> String {
        format!(
            "SELECT {} native_ts, {} local_str, {} zoned_str{}",
            self.text_cast(&self.timestamp_placeholder(1)),
            self.text_cast(&self.placeholder(2)),
            self.text_cast(&self.placeholder(3)),
            self.from_dual()
        )
    }

    /// Select each literal as a native timestamp followed by its text cast
    pub fn select_literals(&self, literals: &[NaiveDateTime]) -> String {
        let projections: Vec<String> = literals
            .iter()
            .enumerate()
            .map(|(i, literal)| {
                let expr = format!("TIMESTAMP '{}'", format_wall_clock(literal));
                format!("{expr} ts{n}, {} ts{n}_str", self.text_cast(&expr), n = i + 1)
            })
            .collect();
        format!("SELECT {}{}", projections.join(", "), self.from_dual())
    }
}
