use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ReportArgs;
use crate::config::ReportConfig;
use crate::model::{ReportCounts, ReportPaths, ReportRunManifest, SourceHash};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

use super::marketing_source::load_marketing_csv;
use super::normalize::MarketingNormalizer;
use super::order_source::{OrderSource, SqliteOrderStore};
use super::output::write_report_tables;
use super::pipeline::{ReportTables, build_report};

pub fn run(args: ReportArgs) -> Result<()> {
    let config = ReportConfig::from_args(&args)?;
    let store = SqliteOrderStore::open(&config.db_path, &config.orders_query)?;
    run_report(&config, &store)
}

/// Single entry point for a report run: read both sources, compute every
/// table, then write outputs and the run manifest.
pub fn run_report(config: &ReportConfig, orders_source: &dyn OrderSource) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("report-{}", utc_compact_string(started_ts));

    info!(
        run_id = %run_id,
        db_path = %config.db_path.display(),
        marketing_csv = %config.marketing_csv_path.display(),
        "starting report"
    );

    let orders = orders_source.load_orders()?;
    let raw_marketing = load_marketing_csv(&config.marketing_csv_path)?;

    let normalizer = MarketingNormalizer::new()?;
    let tables = build_report(&normalizer, &orders, &raw_marketing, config.top_n)?;
    let counts = tables.counts(&orders);
    let warnings = collect_warnings(&tables, &counts);
    for warning in &warnings {
        warn!(run_id = %run_id, "{warning}");
    }

    let outputs = write_report_tables(&config.output_dir, &tables)?;
    for path in &outputs {
        info!(path = %path.display(), "wrote report table");
    }

    let mut source_hashes = vec![SourceHash {
        path: config.marketing_csv_path.display().to_string(),
        sha256: sha256_file(&config.marketing_csv_path)?,
    }];
    if config.db_path.exists() {
        source_hashes.push(SourceHash {
            path: config.db_path.display().to_string(),
            sha256: sha256_file(&config.db_path)?,
        });
    }

    let manifest = ReportRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_report_command(config),
        paths: ReportPaths {
            workspace_root: config.workspace_root.display().to_string(),
            db_path: config.db_path.display().to_string(),
            marketing_csv_path: config.marketing_csv_path.display().to_string(),
            output_dir: config.output_dir.display().to_string(),
            outputs: outputs
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
        },
        counts: counts.clone(),
        source_hashes,
        warnings,
        notes: vec![
            "Months are the sales calendar; spend-only months are not reported.".to_string(),
            "Empty cells mean missing, never zero.".to_string(),
        ],
    };

    write_json_pretty(&config.manifest_path, &manifest)?;
    info!(path = %config.manifest_path.display(), "wrote report manifest");
    info!(
        run_id = %run_id,
        months = counts.months_reported,
        months_without_spend = counts.months_without_spend,
        incomplete_channel_months = counts.incomplete_channel_months,
        "report completed"
    );

    Ok(())
}

fn collect_warnings(tables: &ReportTables, counts: &ReportCounts) -> Vec<String> {
    let mut warnings = Vec::new();

    if counts.orders_loaded == 0 {
        warnings.push("order snapshot is empty".to_string());
    }
    if counts.orders_without_date > 0 {
        warnings.push(format!(
            "{} orders have an unparseable order_date and are excluded from monthly tables",
            counts.orders_without_date
        ));
    }
    if counts.marketing_rows_without_month > 0 {
        warnings.push(format!(
            "{} marketing rows have an unparseable month and are excluded from spend totals",
            counts.marketing_rows_without_month
        ));
    }
    if counts.negative_spend_rows > 0 {
        warnings.push(format!(
            "{} marketing rows carried negative spend and were nulled",
            counts.negative_spend_rows
        ));
    }

    let valueless_months: Vec<String> = tables
        .monthly_spend
        .iter()
        .filter(|row| row.marketing_spend.is_none())
        .map(|row| format!("{} ({} records)", row.month.format("%Y-%m"), row.record_count))
        .collect();
    if !valueless_months.is_empty() {
        warnings.push(format!(
            "spend records present but no valued amount for: {}",
            valueless_months.join(", ")
        ));
    }

    warnings
}

fn render_report_command(config: &ReportConfig) -> String {
    format!(
        "spendrecon report --workspace-root {} --db-path {} --marketing-csv {} --output-dir {} --top-n {}",
        config.workspace_root.display(),
        config.db_path.display(),
        config.marketing_csv_path.display(),
        config.output_dir.display(),
        config.top_n
    )
}
