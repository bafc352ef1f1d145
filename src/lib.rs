pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod io_utils;
pub mod join;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod transform;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, PathArgs},
    config::EtlConfig,
    io_utils::CsvOptions,
    pipeline::PipelineOptions,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("orders_etl", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Clean(args) => handle_clean(&args),
        Commands::Stage(args) => handle_stage(&args),
        Commands::Report(args) => handle_report(&args),
    }
}

fn resolve_config(paths: &PathArgs) -> Result<EtlConfig> {
    let mut config = EtlConfig::resolve(&paths.root, paths.config.as_deref())
        .with_context(|| format!("Resolving configuration under {:?}", paths.root))?;
    config.apply(&paths.overrides());
    debug!("Resolved configuration: {config:?}");
    Ok(config)
}

fn csv_options(delimiter: Option<u8>, encoding: Option<&str>) -> Result<CsvOptions> {
    Ok(CsvOptions {
        delimiter,
        encoding: io_utils::resolve_encoding(encoding)?,
    })
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let config = resolve_config(&args.paths)?;
    let options = PipelineOptions {
        csv: csv_options(args.paths.delimiter, args.paths.input_encoding.as_deref())?,
        require_unique_order_id: args.require_unique_order_id,
        check_ranges: args.check_ranges,
    };
    if let Some(delimiter) = options.csv.delimiter {
        info!("Reading inputs with delimiter '{}'", printable_delimiter(delimiter));
    }
    let meta = pipeline::run_etl(&config, &options)?;
    info!(
        "Analytics rows: {} (from {} raw order(s)); metadata written to {:?}",
        meta.rows_out_analytics, meta.rows_in_orders_raw, config.run_meta
    );
    Ok(())
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let config = resolve_config(&args.paths)?;
    let options = PipelineOptions {
        csv: csv_options(args.paths.delimiter, args.paths.input_encoding.as_deref())?,
        ..PipelineOptions::default()
    };
    let orders = pipeline::clean(&config, &options)?;
    info!(
        "Cleaned {} order(s) into {:?}",
        orders.row_count(),
        config.out_orders_clean
    );
    Ok(())
}

fn handle_stage(args: &cli::StageArgs) -> Result<()> {
    let config = resolve_config(&args.paths)?;
    let options = PipelineOptions {
        csv: csv_options(args.paths.delimiter, args.paths.input_encoding.as_deref())?,
        ..PipelineOptions::default()
    };
    pipeline::stage_raw(&config, &options)
}

fn handle_report(args: &cli::ReportArgs) -> Result<()> {
    let csv = csv_options(args.delimiter, args.input_encoding.as_deref())?;
    let orders = io_utils::read_dataset(&args.input, &csv)
        .with_context(|| format!("Loading orders from {:?}", args.input))?;
    validate::require_columns(&orders, pipeline::ORDER_COLUMNS)?;
    let typed = transform::enforce_schema(&orders)?;
    let entries = report::missingness_report(&typed);
    match &args.output {
        Some(path) => {
            pipeline::write_missingness_report(&entries, path)?;
        }
        None => {
            let headers = ["column", "n_missing", "p_missing"]
                .iter()
                .map(|h| h.to_string())
                .collect::<Vec<_>>();
            table::print_table(&headers, &report::render_rows(&entries));
        }
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
