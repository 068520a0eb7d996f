use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::cli::ReportArgs;

pub const DEFAULT_DB_FILENAME: &str = "shop.sqlite";
pub const DEFAULT_MARKETING_FILENAME: &str = "marketing_spend.csv";
pub const DEFAULT_OUTPUT_DIRNAME: &str = "reports";
pub const REPORT_MANIFEST_FILENAME: &str = "report_manifest.json";

pub const DEFAULT_ORDERS_QUERY: &str = "
    SELECT order_id, customer_id, order_date, order_amount, product_category
    FROM orders
    ";

/// Everything a report run needs, resolved once from the command line.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub workspace_root: PathBuf,
    pub db_path: PathBuf,
    pub marketing_csv_path: PathBuf,
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub orders_query: String,
    pub top_n: usize,
}

impl ReportConfig {
    pub fn from_args(args: &ReportArgs) -> Result<Self> {
        if args.top_n == 0 {
            bail!("--top-n must be at least 1");
        }

        let workspace_root = args.workspace_root.clone();
        let db_path = resolve_db_path(&workspace_root, args.db_path.as_deref());
        let marketing_csv_path = args
            .marketing_csv
            .clone()
            .unwrap_or_else(|| workspace_root.join(DEFAULT_MARKETING_FILENAME));
        let output_dir = resolve_output_dir(&workspace_root, args.output_dir.as_deref());
        let manifest_path = output_dir.join(REPORT_MANIFEST_FILENAME);
        let orders_query = args
            .orders_query
            .clone()
            .unwrap_or_else(|| DEFAULT_ORDERS_QUERY.to_string());

        Ok(Self {
            workspace_root,
            db_path,
            marketing_csv_path,
            output_dir,
            manifest_path,
            orders_query,
            top_n: args.top_n,
        })
    }
}

pub fn resolve_db_path(workspace_root: &Path, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| workspace_root.join(DEFAULT_DB_FILENAME))
}

pub fn resolve_output_dir(workspace_root: &Path, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| workspace_root.join(DEFAULT_OUTPUT_DIRNAME))
}
