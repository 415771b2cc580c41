use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::ProbeError;

static OFFSET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-])(\d{1,2})(?::?(\d{2}))?$").unwrap()
});

/// Largest offset any of the supported backends accepts for a session zone
const MAX_OFFSET_HOURS: i32 = 14;

/// A time zone as configured for the probe: either a fixed UTC offset or an IANA zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSpec {
    Fixed(FixedOffset),
    Named(Tz),
}

/// How a wall-clock time relates to a zone's transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalKind {
    /// Maps to exactly one instant
    Unique,
    /// Skipped by a spring-forward transition
    Gap,
    /// Repeated by a fall-back transition
    Ambiguous,
}

impl ZoneSpec {
    /// Parse `UTC`, `Z`, an IANA name, or a numeric offset (`+05`, `+05:00`, `-0330`)
    pub fn parse(value: &str) -> Result<Self, ProbeError> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("z") {
            return Ok(ZoneSpec::Fixed(Utc.fix()));
        }

        if let Some(caps) = OFFSET_PATTERN.captures(trimmed) {
            let invalid = || ProbeError::InvalidZone(value.to_string());
            let hours: i32 = caps[2].parse().map_err(|_| invalid())?;
            let minutes: i32 = match caps.get(3) {
                Some(m) => m.as_str().parse().map_err(|_| invalid())?,
                None => 0,
            };
            if hours > MAX_OFFSET_HOURS || minutes > 59 {
                return Err(invalid());
            }
            let sign = if &caps[1] == "-" { -1 } else { 1 };
            return FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
                .map(ZoneSpec::Fixed)
                .ok_or_else(invalid);
        }

        Tz::from_str(trimmed)
            .map(ZoneSpec::Named)
            .map_err(|_| ProbeError::InvalidZone(value.to_string()))
    }

    /// IANA name of a named zone, `None` for fixed offsets
    pub fn name(&self) -> Option<&'static str> {
        match self {
            ZoneSpec::Fixed(_) => None,
            ZoneSpec::Named(tz) => Some(tz.name()),
        }
    }

    /// UTC offset in effect at `instant`
    pub fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        match self {
            ZoneSpec::Fixed(offset) => *offset,
            ZoneSpec::Named(tz) => tz.offset_from_utc_datetime(&instant.naive_utc()).fix(),
        }
    }

    /// The instant as seen on a wall clock in this zone
    pub fn to_zoned(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset_at(instant))
    }

    pub fn classify(&self, local: NaiveDateTime) -> LocalKind {
        match self {
            ZoneSpec::Fixed(_) => LocalKind::Unique,
            ZoneSpec::Named(tz) => match tz.from_local_datetime(&local) {
                LocalResult::Single(_) => LocalKind::Unique,
                LocalResult::Ambiguous(_, _) => LocalKind::Ambiguous,
                LocalResult::None => LocalKind::Gap,
            },
        }
    }

    /// Pin a wall-clock time to this zone, leniently.
    ///
    /// A time skipped by a spring-forward transition keeps the offset in effect
    /// before the transition, which moves it forward by the gap length
    /// (2021-03-14 02:01:01 in New York becomes 03:01:01-04:00). A repeated time
    /// resolves to the later of its two instants, on the post-transition offset
    /// (2021-11-07 01:01:01 in New York becomes 01:01:01-05:00).
    pub fn resolve(&self, local: NaiveDateTime) -> DateTime<FixedOffset> {
        match self {
            ZoneSpec::Fixed(offset) => pin_with_offset(local, *offset),
            ZoneSpec::Named(tz) => match tz.from_local_datetime(&local) {
                LocalResult::Single(dt) => dt.fixed_offset(),
                LocalResult::Ambiguous(_, latest) => latest.fixed_offset(),
                LocalResult::None => {
                    // Transitions are never a day apart, so a day earlier is on the old offset
                    let before = tz
                        .offset_from_local_datetime(&(local - Duration::days(1)))
                        .earliest()
                        .map(|offset| offset.fix())
                        .unwrap_or_else(|| tz.offset_from_utc_datetime(&local).fix());
                    let instant = pin_with_offset(local, before).with_timezone(&Utc);
                    self.to_zoned(instant)
                }
            },
        }
    }
}

fn pin_with_offset(local: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = local - Duration::seconds(offset.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, offset)
}

impl fmt::Display for ZoneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneSpec::Fixed(offset) => write!(f, "{}", offset),
            ZoneSpec::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl FromStr for ZoneSpec {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ZoneSpec::parse(s)
    }
}

impl Serialize for ZoneSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
