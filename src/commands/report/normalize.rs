use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::model::{Channel, ExpectedChannel, MarketingRecord, RawMarketingRow};
use crate::util::{month_start, parse_amount, parse_calendar_date};

const MONTH_NAME_FORMATS: &[&str] = &["%d %b %Y", "%d %B %Y"];

/// Cleans raw spend-export rows. Malformed fields degrade to missing values.
pub struct MarketingNormalizer {
    year_month: Regex,
}

impl MarketingNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            year_month: Regex::new(r"^(\d{4})[-/.](\d{1,2})$")
                .context("failed to compile year-month regex")?,
        })
    }

    pub fn normalize(&self, raw: &RawMarketingRow) -> MarketingRecord {
        let (spend_amount, negative_spend_flag) = match parse_amount(&raw.spend_amount) {
            Some(amount) if amount < Decimal::ZERO => (None, true),
            parsed => (parsed, false),
        };

        MarketingRecord {
            month: self.parse_month(&raw.month),
            channel: canonicalize_channel(&raw.channel),
            spend_amount,
            negative_spend_flag,
        }
    }

    pub fn normalize_all(&self, rows: &[RawMarketingRow]) -> Vec<MarketingRecord> {
        rows.iter().map(|row| self.normalize(row)).collect()
    }

    /// Returns the first day of the month `raw` falls in.
    pub fn parse_month(&self, raw: &str) -> Option<NaiveDate> {
        let value = raw.trim();

        if let Some(captures) = self.year_month.captures(value) {
            let year = captures.get(1)?.as_str().parse::<i32>().ok()?;
            let month = captures.get(2)?.as_str().parse::<u32>().ok()?;
            return NaiveDate::from_ymd_opt(year, month, 1);
        }

        if let Some(date) = parse_calendar_date(value) {
            return Some(month_start(date));
        }

        // "Mar 2024" / "March 2024"
        let with_day = format!("01 {value}");
        MONTH_NAME_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(&with_day, format).ok())
    }
}

pub fn canonicalize_channel(raw: &str) -> Channel {
    let trimmed = raw.trim();
    match ExpectedChannel::from_alias(&trimmed.to_lowercase()) {
        Some(channel) => Channel::Expected(channel),
        None => Channel::Fallback(title_case(trimmed)),
    }
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_alphabetic = false;

    for ch in value.chars() {
        if ch.is_alphabetic() {
            if previous_alphabetic {
                out.extend(ch.to_lowercase());
            } else {
                // Only the first char of a multi-char upper-casing (ß -> SS) stays upper.
                let mut upper = ch.to_uppercase();
                out.extend(upper.next());
                out.extend(upper.flat_map(char::to_lowercase));
            }
            previous_alphabetic = true;
        } else {
            out.push(ch);
            previous_alphabetic = false;
        }
    }

    out
}
