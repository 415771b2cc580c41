//! Timestamp round-trip probe
//!
//! One routine shared by every backend: provision the scratch table, insert a
//! sample under the default zone, read it back under another session zone, bind
//! one instant three ways, and map DST-boundary literals onto a zone.

pub mod report;
pub mod runner;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use tracing::{debug, info, warn};

use crate::backend::ProbeConnection;
use crate::types::datetime_utils::parse_local;
use crate::types::{
    format_local, format_zoned, parse_timestamp_text, BindValue, LocalKind, ProbeValue, ZoneSpec,
};
use crate::{ProbeError, Result};

pub use report::{
    expected_wall_clock, BackendReport, BindReport, ColumnReport, DstEntry, DstReport, InsertReport,
    ReadReport, Rendering, RowReport,
};
pub use runner::run_backend;

/// Literals straddling the 2021 US-Eastern transitions: inside the spring-forward
/// gap, just after it, and inside the repeated fall-back hour
pub const DST_LITERALS: [&str; 3] = [
    "2021-03-14 02:01:01",
    "2021-03-14 03:01:01",
    "2021-11-07 01:01:01",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Zone the client treats as its own; the insert session uses it
    pub default_zone: ZoneSpec,
    /// DST-observing zone for explicit calendars
    pub reference_zone: ZoneSpec,
    /// Session zone while reading back
    pub session_zone: ZoneSpec,
    /// Wall-clock value stored in `timestamp_val`
    pub sample: NaiveDateTime,
}

pub struct TimestampRoundTripProbe {
    settings: ProbeSettings,
    clock: fn() -> DateTime<Utc>,
}

impl TimestampRoundTripProbe {
    pub fn new(settings: ProbeSettings) -> Self {
        TimestampRoundTripProbe {
            settings,
            clock: Utc::now,
        }
    }

    /// Replace the client clock used for remarks, bind values and report headers
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)().trunc_subsecs(6)
    }

    /// Drop and recreate the scratch table
    pub async fn provision(&self, conn: &mut dyn ProbeConnection) -> Result<()> {
        let dialect = conn.dialect();
        for sql in [dialect.drop_table(), dialect.create_table()] {
            debug!("Provisioning: {}", sql);
            conn.execute(&sql, &[]).await.map_err(ProbeError::Schema)?;
        }
        Ok(())
    }

    /// Insert the sample row under the default zone
    pub async fn insert_sample(&self, conn: &mut dyn ProbeConnection) -> Result<InsertReport> {
        let zone = self.settings.default_zone;
        conn.set_session_zone(&zone).await.map_err(ProbeError::Write)?;

        let value = self.settings.sample;
        let remarks = format!(
            "Inserted value '{}' at: {}",
            format_zoned(&zone.resolve(value), &zone),
            format_zoned(&zone.to_zoned(self.now()), &zone)
        );
        let sql = conn.dialect().insert_sample();
        let rows_affected = conn
            .execute(&sql, &[BindValue::Timestamp(value), BindValue::Text(remarks.clone())])
            .await
            .map_err(ProbeError::Write)?;
        info!("Inserted {} row(s) with timestamp_val {}", rows_affected, value);

        Ok(InsertReport {
            session_zone: zone,
            value,
            remarks,
            rows_affected,
        })
    }

    /// Read every row back with the session set to `session_zone`
    pub async fn read_and_report(
        &self,
        conn: &mut dyn ProbeConnection,
        session_zone: &ZoneSpec,
    ) -> Result<ReadReport> {
        conn.set_session_zone(session_zone).await.map_err(ProbeError::Query)?;
        let dialect = conn.dialect();
        let rows = conn
            .query(&dialect.select_rows(), &[])
            .await
            .map_err(ProbeError::Query)?;
        let retrieved_at = self.now();

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| RowReport {
                number: i + 1,
                retrieved_at,
                columns: row
                    .columns
                    .into_iter()
                    .map(|column| ColumnReport {
                        rendering: self.render(&column.value, session_zone),
                        name: column.name,
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();
        info!("Read {} row(s) under session zone {}", rows.len(), session_zone);

        let semantics = dialect.timestamp_semantics();
        let expected = expected_wall_clock(
            semantics,
            self.settings.sample,
            &self.settings.default_zone,
            session_zone,
        );
        for row in &rows {
            if let Some(Rendering::Timestamp { wall_clock: Some(observed), .. }) = row.column("timestamp_val") {
                if *observed != expected {
                    warn!(
                        "Row #{} timestamp_val is {}, expected {} for {:?} storage",
                        row.number, observed, expected, semantics
                    );
                }
            }
        }

        Ok(ReadReport {
            session_zone: *session_zone,
            default_zone: self.settings.default_zone,
            reference_zone: self.settings.reference_zone,
            semantics,
            rows,
        })
    }

    /// Render a column with the default calendar and with the reference calendar
    fn render(&self, value: &ProbeValue, session_zone: &ZoneSpec) -> Rendering {
        let ProbeSettings {
            default_zone,
            reference_zone,
            ..
        } = self.settings;
        match value {
            ProbeValue::Timestamp(wall_clock) => Rendering::Timestamp {
                wall_clock: *wall_clock,
                default_calendar: wall_clock.map(|ts| default_zone.resolve(ts)),
                reference_calendar: wall_clock.map(|ts| {
                    default_zone.to_zoned(reference_zone.resolve(ts).to_utc())
                }),
                reference_instant: wall_clock.map(|ts| {
                    reference_zone.to_zoned(session_zone.resolve(ts).to_utc())
                }),
            },
            ProbeValue::Text(text) => Rendering::Text { value: text.clone() },
        }
    }

    /// Bind the current instant as a calendar timestamp, a local string and a zoned string
    pub async fn probe_explicit_calendar_bind(
        &self,
        conn: &mut dyn ProbeConnection,
        reference_zone: &ZoneSpec,
    ) -> Result<BindReport> {
        let session_zone = self.settings.default_zone;
        conn.set_session_zone(&session_zone).await.map_err(ProbeError::Query)?;

        let bound = reference_zone.to_zoned(self.now());
        let wall_clock = bound.naive_local();
        let params = [
            BindValue::Timestamp(wall_clock),
            BindValue::Text(format_local(&wall_clock)),
            BindValue::Text(format_zoned(&bound, reference_zone)),
        ];
        let sql = conn.dialect().select_bound();
        let rows = conn.query(&sql, &params).await.map_err(ProbeError::Query)?;
        let row = match rows.as_slice() {
            [row] if row.len() == 3 => row,
            _ => {
                return Err(ProbeError::Decode(format!(
                    "expected one row of three columns from bound select, got {} row(s)",
                    rows.len()
                )))
            }
        };

        let texts: Vec<Option<String>> = (0..3)
            .map(|i| row.value(i).and_then(ProbeValue::to_text))
            .collect();
        let instant = |text: &Option<String>, zone: &ZoneSpec| {
            text.as_deref()
                .and_then(parse_timestamp_text)
                .map(|parsed| parsed.instant_in(zone))
        };

        let report = BindReport {
            reference_zone: *reference_zone,
            session_zone,
            bound,
            native_instant: instant(&texts[0], reference_zone),
            naive_instant: instant(&texts[1], &session_zone),
            zoned_instant: instant(&texts[2], reference_zone),
            native_text: texts[0].clone(),
            naive_text: texts[1].clone(),
            zoned_text: texts[2].clone(),
        };
        if !report.native_matches_zoned() {
            warn!(
                "Calendar bind {:?} and zoned string {:?} denote different instants",
                report.native_text, report.zoned_text
            );
        }
        Ok(report)
    }

    /// Select the DST literals and map each onto `zone`
    ///
    /// The zone is passed in rather than installed as a process default, so
    /// nothing needs restoring when the query fails.
    pub async fn probe_dst_boundary(
        &self,
        conn: &mut dyn ProbeConnection,
        zone: &ZoneSpec,
    ) -> Result<DstReport> {
        let literals = DST_LITERALS
            .iter()
            .map(|text| {
                parse_local(text).ok_or_else(|| ProbeError::Decode(format!("bad DST literal {text}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let sql = conn.dialect().select_literals(&literals);
        let rows = conn.query(&sql, &[]).await.map_err(ProbeError::Query)?;
        let row = match rows.as_slice() {
            [row] if row.len() == literals.len() * 2 => row,
            _ => {
                return Err(ProbeError::Decode(format!(
                    "expected one row of {} columns from literal select",
                    literals.len() * 2
                )))
            }
        };

        let entries = literals
            .iter()
            .enumerate()
            .map(|(i, literal)| {
                let native = row.value(i * 2).and_then(ProbeValue::as_timestamp);
                let entry = DstEntry {
                    literal: *literal,
                    text: row.value(i * 2 + 1).and_then(ProbeValue::to_text),
                    native,
                    kind: native.map(|ts| zone.classify(ts)),
                    instant: native.map(|ts| zone.resolve(ts)),
                };
                if entry.kind == Some(LocalKind::Gap) {
                    debug!("{} falls in a {} gap, normalized to {:?}", literal, zone, entry.instant);
                }
                entry
            })
            .collect();

        Ok(DstReport {
            zone: *zone,
            entries,
        })
    }
}
