use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::model::{ChannelCompletenessRow, ExpectedChannel, MarketingRecord};

/// Month x expected-channel spend matrix. Every row carries all five channel
/// cells; a cell is missing when no record for that month and channel has a
/// valued amount. Fallback channels are not pivoted.
pub fn channel_completeness(records: &[MarketingRecord]) -> Result<Vec<ChannelCompletenessRow>> {
    let mut matrix: BTreeMap<NaiveDate, [Option<Decimal>; 5]> = BTreeMap::new();

    for record in records {
        let Some(month) = record.month else {
            continue;
        };
        let cells = matrix.entry(month).or_insert([None; 5]);

        let (Some(channel), Some(amount)) = (record.channel.expected(), record.spend_amount) else {
            continue;
        };
        let cell = &mut cells[channel.index()];
        let total = cell.unwrap_or(Decimal::ZERO).checked_add(amount);
        *cell = Some(total.with_context(|| {
            format!(
                "{} spend for {} exceeds the decimal range",
                channel.as_str(),
                month.format("%Y-%m")
            )
        })?);
    }

    Ok(matrix
        .into_iter()
        .map(|(month, channel_spend)| {
            let missing_channels = channel_spend.iter().filter(|cell| cell.is_none()).count();
            ChannelCompletenessRow {
                month,
                channel_spend,
                complete_all_channels: missing_channels == 0,
                missing_channels,
            }
        })
        .collect())
}

pub fn header() -> Vec<&'static str> {
    let mut columns = vec!["month"];
    columns.extend(ExpectedChannel::ALL.iter().map(|channel| channel.as_str()));
    columns.push("complete_all_channels");
    columns.push("missing_channels");
    columns
}
