use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(author, version, about = "Clean, join, and profile order extracts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline: validate, clean, join users, derive analytics, write outputs
    Run(RunArgs),
    /// Validate and clean orders, write the missingness report and orders_clean
    Clean(CleanArgs),
    /// Copy raw orders and users into the processed directory unchanged
    Stage(StageArgs),
    /// Print or write the missingness report for an orders file
    Report(ReportArgs),
}

/// Project layout and path overrides shared by the pipeline commands.
#[derive(Debug, Clone, Args)]
pub struct PathArgs {
    /// Project root holding data/raw, data/processed and reports
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// YAML file with path overrides (relative paths resolve against --root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Raw orders CSV
    #[arg(long = "orders")]
    pub raw_orders: Option<PathBuf>,
    /// Raw users CSV
    #[arg(long = "users")]
    pub raw_users: Option<PathBuf>,
    /// Destination for the orders-only projection
    #[arg(long = "out-orders-clean")]
    pub out_orders_clean: Option<PathBuf>,
    /// Destination for the users table
    #[arg(long = "out-users")]
    pub out_users: Option<PathBuf>,
    /// Destination for the joined analytics table
    #[arg(long = "out-analytics")]
    pub out_analytics: Option<PathBuf>,
    /// Destination for the run metadata JSON
    #[arg(long = "run-meta")]
    pub run_meta: Option<PathBuf>,
    /// Destination for the missingness report
    #[arg(long = "missingness-report")]
    pub missingness_report: Option<PathBuf>,
    /// CSV delimiter character for inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl PathArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            raw_orders: self.raw_orders.clone(),
            raw_users: self.raw_users.clone(),
            out_orders_clean: self.out_orders_clean.clone(),
            out_users: self.out_users.clone(),
            out_analytics: self.out_analytics.clone(),
            run_meta: self.run_meta.clone(),
            missingness_report: self.missingness_report.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub paths: PathArgs,
    /// Fail when order_id is null or repeated
    #[arg(long = "require-unique-order-id")]
    pub require_unique_order_id: bool,
    /// Fail when amount or quantity is negative
    #[arg(long = "check-ranges")]
    pub check_ranges: bool,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub paths: PathArgs,
}

#[derive(Debug, Args)]
pub struct StageArgs {
    #[command(flatten)]
    pub paths: PathArgs,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Orders CSV to profile
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Write the report as CSV instead of printing a table
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
