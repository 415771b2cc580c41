use chrono::NaiveDateTime;
use serde::Serialize;

use super::datetime_utils::format_wall_clock;

/// A statement parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    /// Zone-naive timestamp, sent with the driver's native timestamp type
    Timestamp(NaiveDateTime),
    Text(String),
}

/// A column value as decoded from a result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ProbeValue {
    Timestamp(Option<NaiveDateTime>),
    Text(Option<String>),
}

impl ProbeValue {
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            ProbeValue::Timestamp(ts) => *ts,
            ProbeValue::Text(_) => None,
        }
    }

    /// Textual form of the value; timestamps use the `format_wall_clock` layout
    pub fn to_text(&self) -> Option<String> {
        match self {
            ProbeValue::Timestamp(ts) => ts.as_ref().map(format_wall_clock),
            ProbeValue::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeColumn {
    pub name: String,
    pub value: ProbeValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeRow {
    pub columns: Vec<ProbeColumn>,
}

impl ProbeRow {
    pub fn push(&mut self, name: impl Into<String>, value: ProbeValue) {
        self.columns.push(ProbeColumn {
            name: name.into(),
            value,
        });
    }

    /// Look up a column by name; Oracle reports unquoted names in upper case
    pub fn get(&self, name: &str) -> Option<&ProbeValue> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
            .map(|column| &column.value)
    }

    pub fn value(&self, index: usize) -> Option<&ProbeValue> {
        self.columns.get(index).map(|column| &column.value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
