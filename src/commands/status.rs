use std::fs;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::bootstrap::count_orders;
use crate::config::{REPORT_MANIFEST_FILENAME, resolve_db_path, resolve_output_dir};
use crate::model::ReportRunManifest;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.workspace_root, args.db_path.as_deref());
    let output_dir = resolve_output_dir(&args.workspace_root, args.output_dir.as_deref());
    let manifest_path = output_dir.join(REPORT_MANIFEST_FILENAME);

    info!(workspace_root = %args.workspace_root.display(), "status requested");

    if db_path.exists() {
        let connection = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open {}", db_path.display()))?;

        match count_orders(&connection) {
            Ok(orders) => info!(path = %db_path.display(), orders = orders, "database status"),
            Err(err) => warn!(path = %db_path.display(), error = %err, "orders table unavailable"),
        }
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    if manifest_path.exists() {
        let raw = fs::read(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        let manifest: ReportRunManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

        info!(
            run_id = %manifest.run_id,
            status = %manifest.status,
            updated_at = %manifest.updated_at,
            orders_loaded = manifest.counts.orders_loaded,
            marketing_rows = manifest.counts.marketing_rows,
            months_reported = manifest.counts.months_reported,
            months_without_spend = manifest.counts.months_without_spend,
            incomplete_channel_months = manifest.counts.incomplete_channel_months,
            warnings = manifest.warnings.len(),
            "loaded last report manifest"
        );
        for warning in &manifest.warnings {
            warn!(run_id = %manifest.run_id, "{warning}");
        }
    } else {
        warn!(path = %manifest_path.display(), "report manifest missing");
    }

    Ok(())
}
