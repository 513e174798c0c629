//! Value types shared between the model and the engine boundary.
//!
//! Data sources hand records over as raw text; each sensor encoding declares a
//! [`FieldType`] and converts the raw value into a typed [`FieldValue`] before
//! encoding. Timestamps use a plain calendar struct so the crate carries no
//! time-zone machinery.

use crate::error::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Index of a node in the network's insertion-order node list.
pub type NodeId = usize;

/// One encoder construction parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// On/off switch.
    Bool(bool),
    /// Whole-number knob.
    Int(i64),
    /// Floating-point knob.
    Float(f64),
    /// Textual knob.
    Text(String),
}

/// Named encoder construction parameters, passed to the engine verbatim.
pub type EncoderParams = BTreeMap<String, ParamValue>;

/// Declared type of a data-source field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// True/false flags, also accepted as `0`/`1`.
    Boolean,
    /// Signed whole numbers.
    Integer,
    /// Floating-point numbers.
    Decimal,
    /// Calendar timestamps in `YYYY-MM-DD HH:MM:SS` form.
    DateTime,
    /// Free text and categories.
    Text,
}

impl FieldType {
    /// Lowercase name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::DateTime => "date-time",
            FieldType::Text => "text",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A calendar timestamp without time-zone information.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateTimeValue {
    /// Gregorian year.
    pub year: i32,
    /// Month, 1 through 12.
    pub month: u8,
    /// Day of month, 1 through 31.
    pub day: u8,
    /// Hour, 0 through 23.
    pub hour: u8,
    /// Minute, 0 through 59.
    pub minute: u8,
    /// Second, 0 through 59.
    pub second: u8,
}

impl DateTimeValue {
    /// Builds a timestamp from its parts. Parts are not range-checked here;
    /// use [`DateTimeValue::parse`] for validated input.
    pub fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        DateTimeValue {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Parses `YYYY-MM-DD HH:MM:SS`, returning `None` for anything malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        let (date, time) = raw.trim().split_once(' ')?;
        let mut date_parts = date.split('-');
        let year: i32 = date_parts.next()?.parse().ok()?;
        let month: u8 = date_parts.next()?.parse().ok()?;
        let day: u8 = date_parts.next()?.parse().ok()?;
        if date_parts.next().is_some() {
            return None;
        }
        let mut time_parts = time.split(':');
        let hour: u8 = time_parts.next()?.parse().ok()?;
        let minute: u8 = time_parts.next()?.parse().ok()?;
        let second: u8 = time_parts.next()?.parse().ok()?;
        if time_parts.next().is_some() {
            return None;
        }
        let valid = (1..=12).contains(&month)
            && (1..=31).contains(&day)
            && hour < 24
            && minute < 60
            && second < 60;
        valid.then_some(DateTimeValue::new(year, month, day, hour, minute, second))
    }

    /// Seconds since the Unix epoch (negative before 1970).
    pub fn timestamp(&self) -> i64 {
        let days = days_from_civil(self.year as i64, self.month as i64, self.day as i64);
        days * 86_400 + self.hour as i64 * 3_600 + self.minute as i64 * 60 + self.second as i64
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Days between a civil date and 1970-01-01, Gregorian calendar.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * (if month > 2 { month - 3 } else { month + 9 }) + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// A typed record value as read from a data source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// No value (before the first record, or an inference gap).
    #[default]
    None,
    /// Boolean flag.
    Bool(bool),
    /// Whole number.
    Int(i64),
    /// Floating-point number.
    Dec(f64),
    /// Calendar timestamp.
    Stamp(DateTimeValue),
    /// Free text.
    Text(String),
}

impl FieldValue {
    /// Converts a raw record value according to the declared field type.
    pub fn parse(raw: &str, field_type: FieldType) -> Result<Self> {
        let trimmed = raw.trim();
        let malformed = || ScopeError::MalformedRecord {
            field: String::new(),
            value: raw.to_string(),
            expected: field_type.label(),
        };
        match field_type {
            FieldType::Boolean => match trimmed {
                "1" | "true" | "True" | "TRUE" => Ok(FieldValue::Bool(true)),
                "0" | "false" | "False" | "FALSE" => Ok(FieldValue::Bool(false)),
                _ => Err(malformed()),
            },
            FieldType::Integer => trimmed
                .parse::<i64>()
                .map(FieldValue::Int)
                .map_err(|_| malformed()),
            FieldType::Decimal => trimmed
                .parse::<f64>()
                .map(FieldValue::Dec)
                .map_err(|_| malformed()),
            FieldType::DateTime => DateTimeValue::parse(trimmed)
                .map(FieldValue::Stamp)
                .ok_or_else(malformed),
            FieldType::Text => Ok(FieldValue::Text(trimmed.to_string())),
        }
    }

    /// Numeric view of the value, when one exists.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            FieldValue::None => None,
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Dec(d) => Some(*d),
            FieldValue::Stamp(s) => Some(s.timestamp() as f64),
            FieldValue::Text(_) => None,
        }
    }

    /// Whether this is the absent value.
    pub fn is_none(&self) -> bool {
        matches!(self, FieldValue::None)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::None => Ok(()),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Dec(d) => write!(f, "{d}"),
            FieldValue::Stamp(s) => write!(f, "{s}"),
            FieldValue::Text(t) => f.write_str(t),
        }
    }
}
