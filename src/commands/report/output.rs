use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::model::{ChannelCompletenessRow, ExpectedChannel};
use crate::util::ensure_directory;

use super::completeness;
use super::pipeline::ReportTables;

const MONTH_FORMAT: &str = "%Y-%m-%d";

const MONTHLY_SALES_HEADER: &[&str] = &["month", "order_count", "total_sales"];
const CATEGORY_SALES_HEADER: &[&str] = &["month", "product_category", "order_count", "total_sales"];
const MARKETING_CLEAN_HEADER: &[&str] =
    &["month", "channel", "spend_amount", "negative_spend_flag"];
const SALES_MARKETING_HEADER: &[&str] = &["month", "order_count", "total_sales", "marketing_spend"];
const MONTHLY_ROI_HEADER: &[&str] = &["month", "total_sales", "marketing_spend", "roi"];
const TOP_CUSTOMERS_HEADER: &[&str] = &["customer_id", "orders_count", "total_spent"];

pub fn write_report_tables(output_dir: &Path, tables: &ReportTables) -> Result<Vec<PathBuf>> {
    ensure_directory(output_dir)?;

    let written = vec![
        emit(output_dir, "monthly_sales.csv", |out| {
            write_table(out, MONTHLY_SALES_HEADER, &tables.monthly_sales)
        })?,
        emit(output_dir, "monthly_category_sales.csv", |out| {
            write_table(out, CATEGORY_SALES_HEADER, &tables.monthly_category_sales)
        })?,
        emit(output_dir, "marketing_clean.csv", |out| {
            write_table(out, MARKETING_CLEAN_HEADER, &tables.marketing_clean)
        })?,
        emit(output_dir, "sales_marketing_merge.csv", |out| {
            write_table(out, SALES_MARKETING_HEADER, &tables.sales_marketing)
        })?,
        emit(output_dir, "monthly_roi.csv", |out| {
            write_table(out, MONTHLY_ROI_HEADER, &tables.monthly_roi)
        })?,
        emit(output_dir, "top_customers.csv", |out| {
            write_table(out, TOP_CUSTOMERS_HEADER, &tables.top_customers)
        })?,
        emit(output_dir, "channel_completeness.csv", |out| {
            write_completeness(out, &tables.channel_completeness)
        })?,
    ];

    Ok(written)
}

fn emit<F>(output_dir: &Path, filename: &str, render: F) -> Result<PathBuf>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let mut buffer = Vec::new();
    render(&mut buffer).with_context(|| format!("failed to render {filename}"))?;

    let path = output_dir.join(filename);
    write_atomically(&path, &buffer)?;
    Ok(path)
}

/// Header is written even when `rows` is empty.
pub fn write_table<W: Write, T: Serialize>(writer: W, header: &[&str], rows: &[T]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer
        .write_record(header)
        .context("failed to write csv header")?;
    for row in rows {
        csv_writer
            .serialize(row)
            .context("failed to serialize csv row")?;
    }
    csv_writer.flush().context("failed to flush csv output")?;
    Ok(())
}

pub fn write_completeness<W: Write>(writer: W, rows: &[ChannelCompletenessRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(completeness::header())
        .context("failed to write completeness header")?;

    for row in rows {
        let mut record = Vec::with_capacity(ExpectedChannel::ALL.len() + 3);
        record.push(row.month.format(MONTH_FORMAT).to_string());
        record.extend(ExpectedChannel::ALL.iter().map(|channel| {
            row.spend_for(*channel)
                .map(|amount| amount.to_string())
                .unwrap_or_default()
        }));
        record.push(row.complete_all_channels.to_string());
        record.push(row.missing_channels.to_string());
        csv_writer
            .write_record(&record)
            .context("failed to write completeness row")?;
    }

    csv_writer.flush().context("failed to flush completeness output")?;
    Ok(())
}

fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let staging = path.with_extension("csv.partial");
    let mut file = File::create(&staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;
    file.write_all(data)
        .with_context(|| format!("failed to write {}", staging.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::model::{MonthlyRoi, MonthlySales};

    fn march() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
    }

    #[test]
    fn empty_table_still_has_a_header() {
        let mut out = Vec::new();
        write_table::<_, MonthlySales>(&mut out, MONTHLY_SALES_HEADER, &[]).expect("write");
        assert_eq!(String::from_utf8(out).expect("utf8"), "month,order_count,total_sales\n");
    }

    #[test]
    fn missing_values_render_as_empty_cells() {
        let rows = vec![
            MonthlyRoi {
                month: march(),
                total_sales: dec!(200),
                marketing_spend: None,
                roi: None,
            },
            MonthlyRoi {
                month: march(),
                total_sales: dec!(200),
                marketing_spend: Some(dec!(3)),
                roi: Some(dec!(200) / dec!(3)),
            },
        ];

        let mut out = Vec::new();
        write_table(&mut out, MONTHLY_ROI_HEADER, &rows).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "month,total_sales,marketing_spend,roi");
        assert_eq!(lines[1], "2024-03-01,200,,");
        assert_eq!(lines[2], "2024-03-01,200,3,66.6667");
    }

    #[test]
    fn completeness_rows_have_uniform_shape() {
        let rows = vec![ChannelCompletenessRow {
            month: march(),
            channel_spend: [Some(dec!(10.5)), None, None, Some(dec!(1)), None],
            complete_all_channels: false,
            missing_channels: 3,
        }];

        let mut out = Vec::new();
        write_completeness(&mut out, &rows).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "month,Facebook,Google Ads,Instagram,TikTok,YouTube,complete_all_channels,missing_channels"
        );
        assert_eq!(lines[1], "2024-03-01,10.5,,,1,,false,3");
    }
}
