//! Safe date handling for backend payloads.
//!
//! Dates reach the dashboard as ISO 8601 strings, RFC 2822 strings, epoch
//! milliseconds, or MongoDB extended-JSON wrappers (`{ "$date": ... }`).
//! [`DateValue`] captures all of them without ever failing to decode, and the
//! functions below degrade to a fallback instead of returning errors.
//!
//! Strings without an explicit offset are read as UTC, and all rendering is
//! done in UTC.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Timelike,
    Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

/// Pattern used by [`format_safe_date`].
pub const DEFAULT_DATE_PATTERN: &str = "dd/MM/yyyy";

/// Text returned when a date is absent or cannot be parsed.
pub const DEFAULT_DATE_FALLBACK: &str = "N/A";

const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
];

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// A date in any of the shapes the backend produces.
#[derive(Debug, Clone, PartialEq)]
pub enum DateValue {
    /// Already-parsed instant
    Instant(DateTime<Utc>),
    /// String representation (ISO 8601, RFC 2822, ...)
    Text(String),
    /// Milliseconds since the Unix epoch
    Millis(i64),
    /// Extended-JSON `{ "$date": ... }` wrapper
    Wrapped(Box<DateValue>),
    /// Any other JSON shape; never parses
    Unrecognized,
}

impl DateValue {
    /// Builds a value from arbitrary JSON without failing.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(truncate_millis))
                .map_or(Self::Unrecognized, Self::Millis),
            Value::Object(mut map) => {
                if let Some(inner) = map.remove("$date") {
                    Self::Wrapped(Box::new(Self::from_json(inner)))
                } else if let Some(Value::String(n)) = map.remove("$numberLong") {
                    n.trim().parse().map_or(Self::Unrecognized, Self::Millis)
                } else {
                    Self::Unrecognized
                }
            }
            _ => Self::Unrecognized,
        }
    }

    /// Top-level `""` and `0` count as "no date at all".
    fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Millis(ms) => *ms == 0,
            _ => false,
        }
    }

    fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(instant) => Some(*instant),
            Self::Text(text) => parse_date_text(text),
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            Self::Wrapped(inner) => inner.resolve(),
            Self::Unrecognized => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_millis(value: f64) -> i64 {
    value.trunc() as i64
}

impl From<DateTime<Utc>> for DateValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Instant(value)
    }
}

impl From<DateTime<FixedOffset>> for DateValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Instant(value.with_timezone(&Utc))
    }
}

impl From<NaiveDate> for DateValue {
    fn from(value: NaiveDate) -> Self {
        Self::Instant(value.and_time(NaiveTime::MIN).and_utc())
    }
}

impl From<&str> for DateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for DateValue {
    fn from(value: i64) -> Self {
        Self::Millis(value)
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

impl Serialize for DateValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Instant(instant) => {
                serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::Text(text) => serializer.serialize_str(text),
            Self::Millis(ms) => serializer.serialize_i64(*ms),
            Self::Wrapped(inner) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$date", inner)?;
                map.end()
            }
            Self::Unrecognized => serializer.serialize_none(),
        }
    }
}

/// Parses a date of any supported shape.
///
/// Returns `None` for absent or blank input, and for anything that does not
/// resolve to a valid instant.
#[must_use]
pub fn parse_safe_date(input: Option<&DateValue>) -> Option<DateTime<Utc>> {
    let value = input?;
    if value.is_blank() {
        return None;
    }
    value.resolve()
}

/// Formats a date with [`DEFAULT_DATE_PATTERN`], or returns
/// [`DEFAULT_DATE_FALLBACK`].
#[must_use]
pub fn format_safe_date(input: Option<&DateValue>) -> String {
    format_safe_date_with(input, DEFAULT_DATE_PATTERN, DEFAULT_DATE_FALLBACK)
}

/// Formats a date with a date-fns style pattern, or returns `fallback`
/// verbatim when the input does not parse.
///
/// Supported tokens: `yyyy`/`yy`, `M`/`MM`/`MMM`/`MMMM`, `d`/`dd`, `H`/`HH`,
/// `h`/`hh`, `m`/`mm`, `s`/`ss`, `S..` (fraction) and `a`. Text between single
/// quotes is copied literally; other letters are copied as-is.
///
/// # Examples
/// ```
/// use ledger_dashboard::core::dates::{DateValue, format_safe_date_with};
///
/// let value = DateValue::from("2024-01-15T09:05:00Z");
/// assert_eq!(format_safe_date_with(Some(&value), "dd/MM/yyyy HH:mm", "-"), "15/01/2024 09:05");
/// assert_eq!(format_safe_date_with(None, "dd/MM/yyyy", "-"), "-");
/// ```
#[must_use]
pub fn format_safe_date_with(input: Option<&DateValue>, pattern: &str, fallback: &str) -> String {
    parse_safe_date(input).map_or_else(|| fallback.to_string(), |date| render_pattern(&date, pattern))
}

/// Coarse "time ago" label relative to the current time.
#[must_use]
pub fn get_date_difference(input: Option<&DateValue>) -> String {
    get_date_difference_at(input, Utc::now())
}

/// Coarse "time ago" label relative to `now`.
///
/// Whole minutes elapsed (truncated) are reported as minutes below 60. From
/// there each unit is derived from the previous one by ceiling division:
/// hours below 24, days below 30, months (of 30 days) below 12, and finally
/// years with one decimal. Exactly 60 minutes is therefore `"1 hours ago"`.
///
/// Units carry an `s` unless the value is zero, which cannot happen past the
/// minutes step, so hour/day/month labels are always plural. Minutes are
/// always plural, and dates in the future produce negative minutes.
#[must_use]
pub fn get_date_difference_at(input: Option<&DateValue>, now: DateTime<Utc>) -> String {
    let Some(date) = parse_safe_date(input) else {
        return DEFAULT_DATE_FALLBACK.to_string();
    };

    let minutes = (now - date).num_minutes();
    if minutes < 60 {
        return format!("{minutes} minutes ago");
    }
    let hours = ceil_div(minutes, 60);
    if hours < 24 {
        return format!("{hours} hour{} ago", plural_suffix(hours));
    }
    let days = ceil_div(hours, 24);
    if days < 30 {
        return format!("{days} day{} ago", plural_suffix(days));
    }
    let months = ceil_div(days, 30);
    if months < 12 {
        return format!("{months} month{} ago", plural_suffix(months));
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let (years, whole_years) = {
        let years = months as f64 / 12.0;
        ((years * 10.0).round() / 10.0, years.ceil() as i64)
    };
    format!("{years:.1} year{} ago", plural_suffix(whole_years))
}

// Callers only pass positive numerators.
const fn ceil_div(n: i64, d: i64) -> i64 {
    (n + d - 1) / d
}

const fn plural_suffix(value: i64) -> &'static str {
    if value == 0 { "" } else { "s" }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(s) {
        return Some(date.with_timezone(&Utc));
    }
    if let Some(date) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(date.with_timezone(&Utc));
    }
    if let Some(date) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(date.and_utc());
    }
    NAIVE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn render_pattern(date: &DateTime<Utc>, pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;

    while i < len {
        let c = chars[i];

        if c == '\'' {
            let mut j = i + 1;
            while j < len {
                if chars[j] == '\'' {
                    // '' inside or outside a quoted run is an escaped quote
                    if j + 1 < len && chars[j + 1] == '\'' {
                        out.push('\'');
                        j += 2;
                        continue;
                    }
                    if j == i + 1 {
                        out.push('\'');
                    }
                    break;
                }
                out.push(chars[j]);
                j += 1;
            }
            i = j + 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            out.push(c);
            i += 1;
            continue;
        }

        let mut j = i;
        while j < len && chars[j] == c {
            j += 1;
        }
        out.push_str(&date_token(date, c, j - i));
        i = j;
    }

    out
}

fn date_token(date: &DateTime<Utc>, letter: char, width: usize) -> String {
    match (letter, width) {
        ('y', 2) => format!("{:02}", date.year().rem_euclid(100)),
        ('y', _) => format!("{:0width$}", date.year()),
        ('M', 1 | 2) => format!("{:0width$}", date.month()),
        ('M', 3) => date.format("%b").to_string(),
        ('M', _) => date.format("%B").to_string(),
        ('d', 1 | 2) => format!("{:0width$}", date.day()),
        ('H', 1 | 2) => format!("{:0width$}", date.hour()),
        ('h', 1 | 2) => format!("{:0width$}", date.hour12().1),
        ('m', 1 | 2) => format!("{:0width$}", date.minute()),
        ('s', 1 | 2) => format!("{:0width$}", date.second()),
        ('S', _) => {
            let mut nanos = format!("{:09}", date.nanosecond() % 1_000_000_000);
            nanos.truncate(width.min(9));
            nanos
        }
        ('a', _) => (if date.hour12().0 { "PM" } else { "AM" }).to_string(),
        // Unknown letters and widths are copied through
        _ => std::iter::repeat_n(letter, width).collect(),
    }
}
