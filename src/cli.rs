use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "spendrecon",
    version,
    about = "Monthly sales and marketing-spend reconciliation reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Bootstrap(BootstrapArgs),
    Report(ReportArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BootstrapArgs {
    #[arg(long, default_value = ".cache/spendrecon")]
    pub workspace_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub sql_script: PathBuf,

    #[arg(long, default_value_t = 5)]
    pub preview_rows: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, default_value = ".cache/spendrecon")]
    pub workspace_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub marketing_csv: Option<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 3)]
    pub top_n: usize,

    #[arg(long)]
    pub orders_query: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/spendrecon")]
    pub workspace_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}
