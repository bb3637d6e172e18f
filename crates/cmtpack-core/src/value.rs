//! Raw cell values and their canonical string forms
//!
//! Table cells arrive as loosely typed scalars. Before they reach the XML
//! document every value is rendered to the literal conventions of the CMT
//! data format:
//!
//! | Raw value                   | Canonical form             |
//! |-----------------------------|----------------------------|
//! | null, NaN, blank text       | `""`                       |
//! | `true` / `false`            | `True` / `False`           |
//! | integer, integral float     | `42`                       |
//! | other float                 | general precision (`42.5`) |
//! | date                        | `2020-01-15T00:00:00`      |
//! | date/time                   | `2020-01-15T08:30:00`      |
//! | text                        | unchanged                  |
//!
//! Legacy `DD.MM.YYYY[ HH:MM[:SS]]` strings are rewritten separately by
//! [`normalize_datetime`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

/// Output layout for legacy date strings.
const CMT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.0000000Z";

/// Recognized legacy date/time layouts, tried in order.
const LEGACY_DATETIME_FORMATS: [&str; 2] = ["%d.%m.%Y %H:%M:%S", "%d.%m.%Y %H:%M"];
const LEGACY_DATE_FORMAT: &str = "%d.%m.%Y";

/// A single raw table cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Calendar date without time
    Date(NaiveDate),
    /// Date with time of day
    DateTime(NaiveDateTime),
    /// Time of day without date
    Time(NaiveTime),
    /// Text
    Text(String),
}

impl RawValue {
    /// Whether the value counts as missing (null or NaN).
    ///
    /// Blank text is *not* missing here; it only canonicalizes to `""`.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Borrow the text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value in its canonical string form
    pub fn to_canonical(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Date(d) => format_iso_datetime(&d.and_time(NaiveTime::MIN)),
            Self::DateTime(dt) => format_iso_datetime(dt),
            Self::Time(t) => format_iso_time(t),
            Self::Text(s) if s.trim().is_empty() => String::new(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Rewrite a legacy `DD.MM.YYYY[ HH:MM[:SS]]` string to the CMT timestamp
/// layout `YYYY-MM-DDTHH:MM:SS.0000000Z`.
///
/// Strings in any other shape are returned unchanged.
///
/// ```
/// use cmtpack_core::value::normalize_datetime;
///
/// assert_eq!(normalize_datetime("25.08.2020 11:30:00"), "2020-08-25T11:30:00.0000000Z");
/// assert_eq!(normalize_datetime("15.01.2020"), "2020-01-15T00:00:00.0000000Z");
/// assert_eq!(normalize_datetime("2020-08-25"), "2020-08-25");
/// ```
pub fn normalize_datetime(value: &str) -> String {
    parse_legacy_datetime(value)
        .map(|dt| dt.format(CMT_DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| value.to_string())
}

fn parse_legacy_datetime(value: &str) -> Option<NaiveDateTime> {
    LEGACY_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, LEGACY_DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn format_iso_datetime(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

fn format_iso_time(t: &NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.6f").to_string()
    }
}

/// Integral floats lose their fraction, others use general precision
/// (six significant digits, scientific outside `1e-4..1e6`).
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return String::new();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    if f.fract() == 0.0 {
        return format!("{f:.0}");
    }
    format_general(f)
}

fn format_general(f: f64) -> String {
    const PRECISION: i32 = 6;

    // Rounding to the target precision can bump the exponent (9.999995 -> 1e1),
    // so take it from the rounded scientific rendering.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, f);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{f:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
