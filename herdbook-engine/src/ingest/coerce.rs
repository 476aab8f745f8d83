// Type Coercion Layer
//
// Converts one raw cell into the typed representation required by its
// field's value class. Coercion never fails: values degrade to null or to the
// original text, and every degradation carries a diagnostic message.

use crate::fields::ValueClass;
use crate::types::{CellValue, FieldValue};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Number, Value};
use std::collections::HashSet;

/// Largest spreadsheet day serial accepted (9999-12-31)
const MAX_DAY_SERIAL: f64 = 2_958_465.0;

/// Day/month/year patterns first, then month/day/year; first match wins
const DATE_PATTERNS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m/%d/%y",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
];

/// Time-of-day suffixes combined with [`DATE_PATTERNS`] for timestamps
const TIME_SUFFIXES: &[&str] = &[" %H:%M:%S", " %H:%M"];

/// Direct timestamp layouts tried before the pattern list
const DIRECT_TIMESTAMP_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Direct layouts carrying an explicit UTC offset (`+0200` or `+02:00`)
const OFFSET_TIMESTAMP_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%d %H:%M %z",
];

/// Zone designators meaning UTC, stripped before naive parsing
const UTC_SUFFIXES: &[&str] = &["Z", " UTC", " GMT"];

/// Tagged coercion result
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Successfully typed value
    Value(FieldValue),
    /// Missing or unparseable value
    Null,
    /// Original text retained because it could not be typed
    Degraded(String),
}

/// Coerced value plus any diagnostic messages
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionOutcome {
    pub value: Coerced,
    pub diagnostics: Vec<String>,
}

impl CoercionOutcome {
    fn value(value: FieldValue) -> Self {
        Self {
            value: Coerced::Value(value),
            diagnostics: Vec::new(),
        }
    }

    fn null() -> Self {
        Self {
            value: Coerced::Null,
            diagnostics: Vec::new(),
        }
    }

    fn null_with(message: String) -> Self {
        Self {
            value: Coerced::Null,
            diagnostics: vec![message],
        }
    }

    fn degraded(original: &str, message: String) -> Self {
        Self {
            value: Coerced::Degraded(original.to_string()),
            diagnostics: vec![message],
        }
    }
}

/// Per-field-class cell coercion
#[derive(Debug, Clone)]
pub struct Coercer {
    null_tokens: HashSet<String>,
}

impl Coercer {
    /// Create a coercer with the given null tokens (matched trimmed, case-insensitive)
    pub fn new<I, S>(null_tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            null_tokens: null_tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// True if `text` is one of the configured null tokens
    pub fn is_null_token(&self, text: &str) -> bool {
        let key = text.trim().to_lowercase();
        key.is_empty() || self.null_tokens.contains(&key)
    }

    /// Coerce one cell for a field of the given class
    pub fn coerce(&self, cell: &CellValue, class: ValueClass) -> CoercionOutcome {
        match cell {
            CellValue::Empty => return CoercionOutcome::null(),
            CellValue::Text(text) if self.is_null_token(text) => return CoercionOutcome::null(),
            CellValue::Number(n) if n.is_nan() => return CoercionOutcome::null(),
            _ => {}
        }

        match class {
            ValueClass::Numeric | ValueClass::Integer => coerce_numeric(cell, class),
            ValueClass::Date => coerce_date(cell),
            ValueClass::Timestamp => coerce_timestamp(cell),
            ValueClass::StructuredMap => coerce_map(cell),
            ValueClass::Text => coerce_text(cell),
        }
    }
}

// ============================================================================
// Numeric
// ============================================================================

/// Parse a locale-ambiguous numeric string
///
/// Whitespace and `%` are stripped. A comma is the decimal separator when no
/// dot is present; when both appear, dots are thousands separators and are
/// removed before the comma becomes the decimal point.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '%')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        if cleaned.contains('.') {
            cleaned.replace('.', "").replace(',', ".")
        } else {
            cleaned.replace(',', ".")
        }
    } else {
        cleaned
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn numeric_value(value: f64, class: ValueClass) -> FieldValue {
    match class {
        ValueClass::Integer => FieldValue::Integer(value.trunc() as i64),
        _ => FieldValue::Number(value),
    }
}

fn coerce_numeric(cell: &CellValue, class: ValueClass) -> CoercionOutcome {
    match cell {
        CellValue::Number(n) if n.is_finite() => CoercionOutcome::value(numeric_value(*n, class)),
        CellValue::Text(text) => match parse_numeric(text) {
            Some(v) => CoercionOutcome::value(numeric_value(v, class)),
            None => CoercionOutcome::null_with(format!("could not parse number from '{}'", text.trim())),
        },
        other => CoercionOutcome::null_with(format!("expected a number, got {}", describe(other))),
    }
}

// ============================================================================
// Date / Timestamp
// ============================================================================

fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

/// Convert a spreadsheet day serial (0 = 1899-12-30) to a date-time
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_DAY_SERIAL).contains(&serial) {
        return None;
    }
    let millis = (serial * 86_400_000.0).round() as i64;
    serial_epoch().checked_add_signed(Duration::milliseconds(millis))
}

/// Year sanity check: `%Y` accepts short years, which must fall through to `%y`
fn plausible(date: NaiveDate) -> bool {
    date.year() >= 1000
}

/// Parse a date from text: ISO prefix fast path, then the ordered pattern list
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();

    if let Some(prefix) = text.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }

    parse_patterned_date(text)
}

/// Whole-text date match with no trailing content allowed
fn parse_whole_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_patterned_date(text))
}

fn parse_patterned_date(text: &str) -> Option<NaiveDate> {
    DATE_PATTERNS.iter().find_map(|pattern| {
        NaiveDate::parse_from_str(text, pattern)
            .ok()
            .filter(|d| plausible(*d))
    })
}

/// Strip a trailing UTC designator (`Z`, ` UTC`, ` GMT`), case-insensitive
fn strip_utc_suffix(text: &str) -> &str {
    for suffix in UTC_SUFFIXES {
        let Some(split_at) = text.len().checked_sub(suffix.len()) else {
            continue;
        };
        if let (Some(head), Some(tail)) = (text.get(..split_at), text.get(split_at..)) {
            if tail.eq_ignore_ascii_case(suffix) {
                return head.trim_end();
            }
        }
    }
    text
}

/// Parse a timestamp from text, normalized to UTC
///
/// Explicit offsets are honored; naive date-times and `Z` / `UTC` suffixes are
/// taken as UTC. Only text that is a whole date with no time part maps to
/// midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in OFFSET_TIMESTAMP_PATTERNS {
        if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive_text = strip_utc_suffix(text);
    for pattern in DIRECT_TIMESTAMP_PATTERNS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_text, pattern) {
            return Some(naive.and_utc());
        }
    }

    for date_pattern in DATE_PATTERNS {
        for suffix in TIME_SUFFIXES {
            let pattern = format!("{}{}", date_pattern, suffix);
            if let Ok(naive) = NaiveDateTime::parse_from_str(naive_text, &pattern) {
                if plausible(naive.date()) {
                    return Some(naive.and_utc());
                }
            }
        }
    }

    parse_whole_date(text).map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn coerce_date(cell: &CellValue) -> CoercionOutcome {
    match cell {
        CellValue::Date(d) => CoercionOutcome::value(FieldValue::Date(*d)),
        CellValue::DateTime(dt) => CoercionOutcome::value(FieldValue::Date(dt.date_naive())),
        CellValue::Number(serial) => match serial_to_datetime(*serial) {
            Some(dt) => CoercionOutcome::value(FieldValue::Date(dt.date())),
            None => CoercionOutcome::null_with(format!("day serial {} is out of range", serial)),
        },
        CellValue::Text(text) => match parse_date(text) {
            Some(date) => CoercionOutcome::value(FieldValue::Date(date)),
            None => CoercionOutcome::degraded(
                text,
                format!("could not normalize date '{}', kept original text", text.trim()),
            ),
        },
        other => CoercionOutcome::null_with(format!("expected a date, got {}", describe(other))),
    }
}

fn coerce_timestamp(cell: &CellValue) -> CoercionOutcome {
    match cell {
        CellValue::DateTime(dt) => CoercionOutcome::value(FieldValue::Timestamp(*dt)),
        CellValue::Date(d) => {
            CoercionOutcome::value(FieldValue::Timestamp(d.and_time(NaiveTime::MIN).and_utc()))
        }
        CellValue::Number(serial) => match serial_to_datetime(*serial) {
            Some(dt) => CoercionOutcome::value(FieldValue::Timestamp(dt.and_utc())),
            None => CoercionOutcome::null_with(format!("day serial {} is out of range", serial)),
        },
        CellValue::Text(text) => {
            match parse_timestamp(text) {
                Some(ts) => CoercionOutcome::value(FieldValue::Timestamp(ts)),
                None => CoercionOutcome::degraded(
                    text,
                    format!("could not normalize timestamp '{}', kept original text", text.trim()),
                ),
            }
        }
        other => CoercionOutcome::null_with(format!("expected a timestamp, got {}", describe(other))),
    }
}

// ============================================================================
// Structured map
// ============================================================================

fn numeric_or_text(raw: &str) -> Value {
    parse_numeric(raw)
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Lenient `key:value, key=value; ...` parsing
fn parse_pairs(text: &str) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for part in text.split([',', ';']) {
        let Some(split_at) = part.find([':', '=']) else {
            continue;
        };
        let key = part[..split_at].trim();
        let value = part[split_at + 1..].trim();
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), numeric_or_text(value));
    }
    (!map.is_empty()).then_some(map)
}

fn raw_map(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("raw".to_string(), value);
    map
}

fn coerce_map(cell: &CellValue) -> CoercionOutcome {
    match cell {
        CellValue::Text(text) => {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
                return CoercionOutcome::value(FieldValue::Map(map));
            }
            match parse_pairs(text) {
                Some(map) => CoercionOutcome::value(FieldValue::Map(map)),
                None => CoercionOutcome {
                    value: Coerced::Value(FieldValue::Map(raw_map(Value::String(text.clone())))),
                    diagnostics: vec![format!("could not parse key/value text '{}', wrapped as raw", text.trim())],
                },
            }
        }
        CellValue::Number(n) => {
            let raw = Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null);
            CoercionOutcome {
                value: Coerced::Value(FieldValue::Map(raw_map(raw))),
                diagnostics: vec![format!("expected key/value text, got number {}", n)],
            }
        }
        other => CoercionOutcome {
            value: Coerced::Value(FieldValue::Map(raw_map(Value::String(text_of(other))))),
            diagnostics: vec![format!("expected key/value text, got {}", describe(other))],
        },
    }
}

// ============================================================================
// Text
// ============================================================================

/// Render a number as text without a trailing `.0` for integral values
pub fn number_to_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn text_of(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Number(n) => number_to_text(*n),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        CellValue::DateTime(dt) => dt.to_rfc3339(),
        CellValue::Empty => String::new(),
    }
}

fn coerce_text(cell: &CellValue) -> CoercionOutcome {
    let text = text_of(cell);
    if text.is_empty() {
        CoercionOutcome::null()
    } else {
        CoercionOutcome::value(FieldValue::Text(text))
    }
}

fn describe(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(s) => format!("text '{}'", s.trim()),
        CellValue::Number(n) => format!("number {}", n),
        CellValue::Bool(b) => format!("boolean {}", b),
        CellValue::Date(d) => format!("date {}", d),
        CellValue::DateTime(dt) => format!("timestamp {}", dt.to_rfc3339()),
        CellValue::Empty => "empty cell".to_string(),
    }
}
