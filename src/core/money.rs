//! Monetary formatting for bolívar amounts.
//!
//! The backend sends amounts either as plain JSON numbers or as strings that
//! use `,` as the decimal separator. Everything here renders in the
//! Venezuelan convention (`.` groups thousands, `,` separates decimals) with a
//! `Bs. ` prefix, and never fails: anything unparseable renders as zero.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Literal currency label prefixed to every rendered amount.
pub const CURRENCY_LABEL: &str = "Bs. ";

/// An amount as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MonetaryAmount {
    /// Plain decimal number
    Number(f64),
    /// Legacy string form, e.g. `"1234,56"`
    Text(String),
    /// Null, absent or of an unexpected JSON type
    #[default]
    Missing,
}

impl MonetaryAmount {
    /// Numeric value of the amount.
    ///
    /// Strings have their first `,` replaced by `.` and are then read the way
    /// a lenient float parser would: the longest numeric prefix wins and
    /// trailing garbage is ignored. Unparseable or non-finite values become `0`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(text) => parse_float_prefix(&text.replacen(',', ".", 1)),
            Self::Missing => 0.0,
        };
        if value.is_finite() { value } else { 0.0 }
    }
}

impl From<f64> for MonetaryAmount {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for MonetaryAmount {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for MonetaryAmount {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for MonetaryAmount {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MonetaryAmount {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&MonetaryAmount> for MonetaryAmount {
    fn from(value: &MonetaryAmount) -> Self {
        value.clone()
    }
}

impl<T: Into<MonetaryAmount>> From<Option<T>> for MonetaryAmount {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

impl<'de> Deserialize<'de> for MonetaryAmount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64().map_or(Self::Missing, Self::Number),
            Value::String(s) => Self::Text(s),
            _ => Self::Missing,
        })
    }
}

impl Serialize for MonetaryAmount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Missing => serializer.serialize_none(),
        }
    }
}

/// Formats an amount of unknown shape as `Bs. 1.234,56`.
///
/// Accepts numbers, comma-decimal strings and `None`. Values with more than
/// two decimals are rounded half away from zero on their shortest decimal
/// representation, so `1.005` renders as `1,01`.
///
/// # Examples
/// ```
/// use ledger_dashboard::core::money::format_monto;
///
/// assert_eq!(format_monto("1234,56"), "Bs. 1.234,56");
/// assert_eq!(format_monto(-5.0), "Bs. -5,00");
/// assert_eq!(format_monto("abc"), "Bs. 0,00");
/// ```
#[must_use]
pub fn format_monto(amount: impl Into<MonetaryAmount>) -> String {
    format_bolivares(amount.into().to_f64())
}

/// Formats an amount transmitted in cents.
///
/// The input is rounded to the nearest integer first (halves toward positive
/// infinity), then divided by 100 and formatted like [`format_monto`].
#[must_use]
pub fn currency(amount_in_cents: f64) -> String {
    let cents = if amount_in_cents.is_finite() {
        round_half_up(amount_in_cents)
    } else {
        0.0
    };
    format_bolivares(cents / 100.0)
}

/// Applies a percentage discount to a price in cents and formats the result
/// with [`currency`].
///
/// The discounted price is first rounded to two decimals.
#[must_use]
pub fn calculate_discount(price: f64, discount_percent: f64) -> String {
    let after_discount = price - price * (discount_percent / 100.0);
    currency((after_discount * 100.0).round() / 100.0)
}

/// Renders a finite value with the currency label and Venezuelan grouping.
#[must_use]
pub fn format_bolivares(value: f64) -> String {
    format!("{CURRENCY_LABEL}{}", format_decimal_es_ve(value))
}

/// `Math.round` semantics: halves go toward positive infinity.
fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 { floor + 1.0 } else { floor }
}

/// Two fixed decimals, `.` thousands separator, `,` decimal separator.
fn format_decimal_es_ve(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    // Integer digits followed by exactly two fractional digits.
    let mut digits: Vec<u8> = int_part.bytes().map(|b| b - b'0').collect();
    let mut frac = frac_part.bytes().map(|b| b - b'0');
    digits.push(frac.next().unwrap_or(0));
    digits.push(frac.next().unwrap_or(0));
    if frac.next().is_some_and(|d| d >= 5) {
        increment_digits(&mut digits);
    }

    let is_zero = digits.iter().all(|&d| d == 0);
    let (int_digits, cents) = digits.split_at(digits.len() - 2);

    let mut out = String::with_capacity(int_digits.len() + int_digits.len() / 3 + 4);
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    for (i, d) in int_digits.iter().enumerate() {
        if i > 0 && (int_digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(char::from(b'0' + d));
    }
    out.push(',');
    for d in cents {
        out.push(char::from(b'0' + d));
    }
    out
}

fn increment_digits(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

/// Reads the longest leading float literal, ignoring leading whitespace.
/// Returns `0` when no digits are found.
fn parse_float_prefix(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < len && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut j = frac_start;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        mantissa_digits += j - frac_start;
        if mantissa_digits > 0 {
            end = j;
        }
    }

    if mantissa_digits == 0 {
        return 0.0;
    }

    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut j = end + 1;
        if j < len && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }

    s[..end].parse::<f64>().unwrap_or(0.0)
}
