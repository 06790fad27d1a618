//! Per-cell type coercion.
//!
//! Only `int`, `decimal` and `date` columns are converted; anything that does
//! not parse is returned unchanged.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use odk_model::{BindType, CellValue};

/// First year representable in the 1900 spreadsheet date system.
pub const SPREADSHEET_EPOCH_YEAR: i32 = 1900;

const SUBMISSION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse `YYYY-MM-DD`, rejecting dates the spreadsheet epoch cannot hold.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .filter(|date| (SPREADSHEET_EPOCH_YEAR..=9999).contains(&date.year()))
}

/// Parse the first 19 characters of a submission timestamp.
pub fn parse_submission_time(text: &str) -> Option<NaiveDateTime> {
    let head = text.get(..19).unwrap_or(text);
    NaiveDateTime::parse_from_str(head, SUBMISSION_TIME_FORMAT).ok()
}

fn coerce_text(text: &str, column_type: BindType) -> Option<CellValue> {
    match column_type {
        BindType::Int => text.trim().parse::<i64>().ok().map(CellValue::Int),
        BindType::Decimal => text.trim().parse::<f64>().ok().map(CellValue::Float),
        BindType::Date => parse_date(text).map(CellValue::Date),
        _ => None,
    }
}

/// Convert `value` to the native type of `column_type`.
pub fn coerce(value: CellValue, column_type: BindType) -> CellValue {
    if !column_type.is_converted() {
        return value;
    }
    match value {
        CellValue::Text(text) => {
            coerce_text(&text, column_type).unwrap_or(CellValue::Text(text))
        }
        CellValue::Float(number) if column_type == BindType::Int && number.fract() == 0.0 => {
            CellValue::Int(number as i64)
        }
        CellValue::Int(number) if column_type == BindType::Decimal => {
            CellValue::Float(number as f64)
        }
        other => other,
    }
}

/// Convert `_submission_time` text into a timestamp.
pub fn coerce_submission_time(value: CellValue) -> CellValue {
    match value {
        CellValue::Text(text) => parse_submission_time(&text)
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Text(text)),
        other => other,
    }
}
