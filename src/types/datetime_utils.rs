/// Rendering and parsing helpers for the timestamp texts exchanged with the backends
use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};

use super::zone::ZoneSpec;

/// A timestamp parsed back from backend text, with its offset when the text carried one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTimestamp {
    pub local: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl ParsedTimestamp {
    /// The instant this text denotes, using `zone` when the text is zone-naive
    pub fn instant_in(&self, zone: &ZoneSpec) -> DateTime<FixedOffset> {
        match self.offset {
            Some(offset) => DateTime::from_naive_utc_and_offset(
                self.local - chrono::Duration::seconds(offset.local_minus_utc() as i64),
                offset,
            ),
            None => zone.resolve(self.local),
        }
    }
}

/// Format a wall-clock value as `YYYY-MM-DD HH:MM:SS.f`
///
/// The fraction is always present, `.0` when there is none.
pub fn format_wall_clock(local: &NaiveDateTime) -> String {
    if local.nanosecond() == 0 {
        local.format("%Y-%m-%d %H:%M:%S.0").to_string()
    } else {
        local.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}

/// ISO-8601 local date-time without zone: `2021-03-14T03:01:01`
pub fn format_local(local: &NaiveDateTime) -> String {
    local.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// ISO-8601 with offset and, for named zones, a bracketed zone id:
/// `2021-03-14T03:01:01-04:00[America/New_York]`
pub fn format_zoned(dt: &DateTime<FixedOffset>, zone: &ZoneSpec) -> String {
    let base = dt.format("%Y-%m-%dT%H:%M:%S%.f%:z").to_string();
    match zone.name() {
        Some(name) => format!("{base}[{name}]"),
        None => base,
    }
}

/// Parse a timestamp rendered by a backend or by [`format_zoned`]
pub fn parse_timestamp_text(text: &str) -> Option<ParsedTimestamp> {
    let trimmed = text.trim();
    // Drop a trailing zone id, the offset before it is authoritative
    let trimmed = match trimmed.find('[') {
        Some(pos) if trimmed.ends_with(']') => &trimmed[..pos],
        _ => trimmed,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ParsedTimestamp {
            local: dt.naive_local(),
            offset: Some(*dt.offset()),
        });
    }

    let zoned_formats = [
        "%Y-%m-%d %H:%M:%S%.f%:z",   // 2021-03-14 03:01:01.5+08:00
        "%Y-%m-%d %H:%M:%S%.f %:z",  // Oracle TIMESTAMP WITH TIME ZONE
        "%Y-%m-%d %H:%M:%S%.f%#z",   // PostgreSQL timestamptz text (+08)
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];
    for format in &zoned_formats {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Some(ParsedTimestamp {
                local: dt.naive_local(),
                offset: Some(*dt.offset()),
            });
        }
    }

    let naive_formats = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    for format in &naive_formats {
        if let Ok(local) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ParsedTimestamp { local, offset: None });
        }
    }

    None
}

/// Parse a configured wall-clock timestamp such as `2021-03-14 02:01:01`
pub fn parse_local(text: &str) -> Option<NaiveDateTime> {
    parse_timestamp_text(text)
        .filter(|parsed| parsed.offset.is_none())
        .map(|parsed| parsed.local)
}
