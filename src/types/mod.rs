// Zone arithmetic and the values exchanged with the backends
pub mod datetime_utils;
pub mod value;
pub mod zone;

pub use datetime_utils::{format_local, format_wall_clock, format_zoned, parse_timestamp_text, ParsedTimestamp};
pub use value::{BindValue, ProbeColumn, ProbeRow, ProbeValue};
pub use zone::{LocalKind, ZoneSpec};
