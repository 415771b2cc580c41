use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::backend::Backend;
use crate::dialect::StorageSemantics;
use crate::types::{format_wall_clock, format_zoned, LocalKind, ZoneSpec};

const LABEL_WIDTH: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertReport {
    pub session_zone: ZoneSpec,
    pub value: NaiveDateTime,
    pub remarks: String,
    pub rows_affected: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendering {
    Timestamp {
        /// Wall-clock fields as the driver returned them
        wall_clock: Option<NaiveDateTime>,
        /// Wall clock pinned to the default zone
        default_calendar: Option<DateTime<FixedOffset>>,
        /// Wall clock pinned to the reference zone, shown in the default zone
        reference_calendar: Option<DateTime<FixedOffset>>,
        /// Wall clock read as session-zone time, shown in the reference zone
        reference_instant: Option<DateTime<FixedOffset>>,
    },
    Text {
        value: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnReport {
    pub name: String,
    pub rendering: Rendering,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowReport {
    pub number: usize,
    pub retrieved_at: DateTime<Utc>,
    pub columns: Vec<ColumnReport>,
}

impl RowReport {
    pub fn column(&self, name: &str) -> Option<&Rendering> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
            .map(|column| &column.rendering)
    }

    /// Text of a column, or the formatted wall clock of a timestamp column
    pub fn text(&self, name: &str) -> Option<String> {
        match self.column(name)? {
            Rendering::Text { value } => value.clone(),
            Rendering::Timestamp { wall_clock, .. } => wall_clock.as_ref().map(format_wall_clock),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadReport {
    pub session_zone: ZoneSpec,
    pub default_zone: ZoneSpec,
    pub reference_zone: ZoneSpec,
    pub semantics: StorageSemantics,
    pub rows: Vec<RowReport>,
}

impl ReadReport {
    /// The only row, when exactly one was read
    pub fn single_row(&self) -> Option<&RowReport> {
        match self.rows.as_slice() {
            [row] => Some(row),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindReport {
    pub reference_zone: ZoneSpec,
    pub session_zone: ZoneSpec,
    /// The bound instant on the reference zone's clock
    pub bound: DateTime<FixedOffset>,
    pub native_text: Option<String>,
    pub naive_text: Option<String>,
    pub zoned_text: Option<String>,
    /// Native text read with the reference calendar
    pub native_instant: Option<DateTime<FixedOffset>>,
    /// Zone-naive text read in the session zone
    pub naive_instant: Option<DateTime<FixedOffset>>,
    pub zoned_instant: Option<DateTime<FixedOffset>>,
}

impl BindReport {
    pub fn native_matches_zoned(&self) -> bool {
        match (self.native_instant, self.zoned_instant) {
            (Some(native), Some(zoned)) => native == zoned,
            _ => false,
        }
    }

    pub fn naive_diverges(&self) -> bool {
        self.naive_instant != self.native_instant
    }

    /// Whether the reference and session zones disagree at the bound instant
    pub fn zones_differ(&self) -> bool {
        let instant = self.bound.to_utc();
        self.reference_zone.offset_at(instant) != self.session_zone.offset_at(instant)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DstEntry {
    pub literal: NaiveDateTime,
    pub text: Option<String>,
    pub native: Option<NaiveDateTime>,
    pub kind: Option<LocalKind>,
    pub instant: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DstReport {
    pub zone: ZoneSpec,
    pub entries: Vec<DstEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendReport {
    pub backend: Backend,
    pub run_id: Uuid,
    pub insert: InsertReport,
    pub read: ReadReport,
    pub bind: BindReport,
    pub dst: DstReport,
}

/// Wall clock a read under `read_zone` should return for `value` written under `insert_zone`
pub fn expected_wall_clock(
    semantics: StorageSemantics,
    value: NaiveDateTime,
    insert_zone: &ZoneSpec,
    read_zone: &ZoneSpec,
) -> NaiveDateTime {
    match semantics {
        StorageSemantics::SessionNormalized => read_zone
            .to_zoned(insert_zone.resolve(value).to_utc())
            .naive_local(),
        StorageSemantics::WallClock => value,
    }
}

fn quoted(value: Option<String>) -> String {
    match value {
        Some(value) => format!("'{value}'"),
        None => "NULL".to_string(),
    }
}

fn zoned(dt: &Option<DateTime<FixedOffset>>, zone: &ZoneSpec) -> String {
    quoted(dt.as_ref().map(|dt| format_zoned(dt, zone)))
}

impl fmt::Display for InsertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Insert under session zone {} ===", self.session_zone)?;
        writeln!(f, "{:<LABEL_WIDTH$}'{}'", "timestamp_val:", format_wall_clock(&self.value))?;
        writeln!(f, "{:<LABEL_WIDTH$}'{}'", "remarks:", self.remarks)?;
        write!(f, "{:<LABEL_WIDTH$}{}", "rows affected:", self.rows_affected)
    }
}

impl fmt::Display for ReadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Read back under session zone {} (default {}, reference {}) ===",
            self.session_zone, self.default_zone, self.reference_zone
        )?;
        for row in &self.rows {
            writeln!(f, "[Time: {}] Row #{}:", row.retrieved_at.to_rfc3339(), row.number)?;
            for column in &row.columns {
                let label = format!("{}:", column.name);
                match &column.rendering {
                    Rendering::Text { value } => {
                        writeln!(f, "{label:<LABEL_WIDTH$}{}", quoted(value.clone()))?;
                    }
                    Rendering::Timestamp {
                        wall_clock,
                        default_calendar,
                        reference_calendar,
                        reference_instant,
                    } => {
                        writeln!(
                            f,
                            "{label:<LABEL_WIDTH$}{}",
                            quoted(wall_clock.as_ref().map(format_wall_clock))
                        )?;
                        writeln!(
                            f,
                            "{:>LABEL_WIDTH$}{}",
                            "(default cal): ",
                            zoned(default_calendar, &self.default_zone)
                        )?;
                        writeln!(
                            f,
                            "{:>LABEL_WIDTH$}{}",
                            "(reference cal): ",
                            zoned(reference_calendar, &self.default_zone)
                        )?;
                        writeln!(
                            f,
                            "{:>LABEL_WIDTH$}{}",
                            "(reference instant): ",
                            zoned(reference_instant, &self.reference_zone)
                        )?;
                    }
                }
            }
        }
        if self.rows.is_empty() {
            writeln!(f, "(no rows)")?;
        }
        Ok(())
    }
}

impl fmt::Display for BindReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Test 'setTimestamp' with Calendar ===")?;
        writeln!(f, "{:<LABEL_WIDTH$}'{}'", "bound instant:", format_zoned(&self.bound, &self.reference_zone))?;
        let lines = [
            ("calendar timestamp:", &self.native_text, &self.native_instant),
            ("local string:", &self.naive_text, &self.naive_instant),
            ("zoned string:", &self.zoned_text, &self.zoned_instant),
        ];
        for (label, text, instant) in lines {
            writeln!(
                f,
                "{label:<LABEL_WIDTH$}{} -> {}",
                quoted(text.clone()),
                zoned(instant, &self.reference_zone)
            )?;
        }
        write!(
            f,
            "calendar matches zoned: {}, local string diverges: {}",
            self.native_matches_zoned(),
            self.naive_diverges()
        )
    }
}

impl fmt::Display for DstReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Test default timezone observing daylight saving ({}) ===", self.zone)?;
        for entry in &self.entries {
            let kind = match entry.kind {
                Some(LocalKind::Unique) | None => "",
                Some(LocalKind::Gap) => " (in spring-forward gap)",
                Some(LocalKind::Ambiguous) => " (in repeated hour, later offset)",
            };
            writeln!(
                f,
                "{} is converted to Timestamp of time instant: {}{}",
                entry.text.clone().unwrap_or_else(|| format_wall_clock(&entry.literal)),
                zoned(&entry.instant, &self.zone),
                kind
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for BackendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "##### {} (run {}) #####", self.backend, self.run_id)?;
        writeln!(f, "{}", self.insert)?;
        write!(f, "{}", self.read)?;
        writeln!(f, "{}", self.bind)?;
        write!(f, "{}", self.dst)
    }
}
