use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const MISSING_SENTINELS: &[&str] = &["", "na", "missing", "null", "none"];

// Largest power of ten a 96-bit decimal mantissa can absorb.
const MAX_EXPONENT: u32 = 28;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

/// Parses a calendar date or timestamp, dropping any time-of-day component.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp.date());
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Lenient money parsing: sentinels and unparseable text are `None`, never zero.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let value = raw.trim().to_lowercase();
    if MISSING_SENTINELS.contains(&value.as_str()) {
        return None;
    }

    value
        .parse::<Decimal>()
        .ok()
        .or_else(|| parse_scientific(&value))
}

/// Mantissa/exponent notation; exponents beyond decimal precision are rejected.
fn parse_scientific(value: &str) -> Option<Decimal> {
    let (mantissa, exponent) = value.split_once('e')?;
    let mantissa = mantissa.parse::<Decimal>().ok()?;
    let exponent = exponent.parse::<i32>().ok()?;
    if exponent.unsigned_abs() > MAX_EXPONENT {
        return None;
    }

    let factor = Decimal::from_i128_with_scale(10_i128.pow(exponent.unsigned_abs()), 0);
    if exponent >= 0 {
        mantissa.checked_mul(factor)
    } else {
        mantissa.checked_div(factor)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn parse_calendar_date_accepts_dates_and_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(parse_calendar_date("2024-03-15"), expected);
        assert_eq!(parse_calendar_date(" 2024/03/15 "), expected);
        assert_eq!(parse_calendar_date("03/15/2024"), expected);
        assert_eq!(parse_calendar_date("2024-03-15 08:30:00"), expected);
        assert_eq!(parse_calendar_date("2024-03-15T08:30:00Z"), expected);
        assert_eq!(parse_calendar_date("not a date"), None);
        assert_eq!(parse_calendar_date(""), None);
    }

    #[test]
    fn month_start_truncates_to_first_day() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date");
        assert_eq!(month_start(date), NaiveDate::from_ymd_opt(2024, 2, 1).expect("valid date"));
    }

    #[test]
    fn parse_amount_maps_sentinels_to_missing() {
        for raw in ["", "  ", "NA", "na", "Missing", "NULL", "None"] {
            assert_eq!(parse_amount(raw), None, "sentinel {raw:?}");
        }
    }

    #[test]
    fn parse_amount_handles_numbers_and_garbage() {
        assert_eq!(parse_amount("120.50"), Some(dec!(120.50)));
        assert_eq!(parse_amount(" -30 "), Some(dec!(-30)));
        assert_eq!(parse_amount("1.5e2"), Some(dec!(150)));
        assert_eq!(parse_amount("2.5E-1"), Some(dec!(0.25)));
        assert_eq!(parse_amount("1e99"), None);
        assert_eq!(parse_amount("bogus"), None);
        assert_eq!(parse_amount("$12"), None);
    }
}
