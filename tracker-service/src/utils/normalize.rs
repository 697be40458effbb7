//! Pure conversions from raw spreadsheet/email values to canonical types.
//!
//! Amounts are whole currency units (KRW carries no minor unit), so
//! everything normalizes to `i64`. Unparseable amounts degrade to zero
//! rather than failing the row.

use calamine::{Data, DataType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Normalize a formatted amount string: keep digits, sign and decimal
/// point, drop everything else (thousands separators, currency suffixes).
pub fn amount_from_text(text: &str) -> i64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();
    cleaned.parse::<f64>().map(|v| v as i64).unwrap_or(0)
}

/// Normalize a spreadsheet amount cell.
pub fn amount_from_cell(cell: &Data) -> i64 {
    match cell {
        Data::Int(v) => *v,
        Data::Float(v) => *v as i64,
        Data::String(s) => amount_from_text(s),
        _ => 0,
    }
}

/// Extract the text content of a cell, coercing numeric cells.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.clone()),
        Data::Int(v) => Some(v.to_string()),
        Data::Float(v) => Some(v.to_string()),
        _ => None,
    }
}

/// Parse a spreadsheet date cell: an Excel serial datetime or one of the
/// string formats the supported exports use.
pub fn date_from_cell(cell: &Data) -> Option<DateTime<Utc>> {
    if let Some(naive) = cell.as_datetime() {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let text = cell_text(cell)?;
    date_from_text(&text)
}

/// Parse a date string in the formats seen across issuer exports.
pub fn date_from_text(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y.%m.%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Parse an email `Date` header (RFC 2822, with a lenient fallback).
pub fn date_from_rfc2822(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
        .or_else(|| date_from_text(text))
}
