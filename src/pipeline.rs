//! Extract → transform → load orchestration.
//!
//! [`run_etl`] is the full pipeline: validate both inputs, clean orders,
//! parse timestamps, join users onto orders (many-to-one), derive the
//! analytics columns, then write analytics, users, the orders-only
//! projection, the missingness report and the run metadata. Validation
//! failures abort before anything is written. The five writes are
//! independent; a crash between them leaves earlier files in place.
//!
//! [`clean`] and [`stage_raw`] are the lighter runs that stop after
//! cleaning orders and after copying raw inputs respectively.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    config::EtlConfig,
    data::Dataset,
    error::{KeyViolation, ValidationError},
    io_utils::{self, CsvOptions},
    join::{JoinSide, JoinValidation, appended_column_names, left_join},
    report::{self, MissingnessEntry, RunMeta},
    transform::{
        add_missing_flags, add_outlier_flag, add_time_parts, apply_mapping, cast_to_string,
        enforce_schema, normalize_text, parse_datetime, winsorize,
    },
    validate::{assert_in_range, assert_non_empty, assert_unique_key, require_columns},
};

pub const ORDER_COLUMNS: &[&str] = &[
    "order_id",
    "user_id",
    "amount",
    "quantity",
    "created_at",
    "status",
];
pub const USER_COLUMNS: &[&str] = &["user_id", "country", "signup_date"];
pub const JOIN_KEY: &str = "user_id";

const STATUS_MAPPING: &[(&str, &str)] = &[
    ("paid", "paid"),
    ("refund", "refund"),
    ("refunded", "refund"),
];
const MISSING_FLAG_COLUMNS: &[&str] = &["amount", "quantity"];
const WINSOR_LO: f64 = 0.01;
const WINSOR_HI: f64 = 0.99;
const OUTLIER_K: f64 = 1.5;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub csv: CsvOptions,
    /// Fail when orders repeat an `order_id` (or leave it null).
    pub require_unique_order_id: bool,
    /// Fail when `amount` or `quantity` is negative after coercion.
    pub check_ranges: bool,
}

/// Everything the transform stage produces.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// Orders right after schema enforcement, before any derived column.
    pub orders_typed: Dataset,
    pub users: Dataset,
    pub analytics: Dataset,
    /// Names under which the join appended user columns to `analytics`.
    pub user_columns: Vec<String>,
}

pub fn status_mapping() -> HashMap<String, String> {
    STATUS_MAPPING
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

pub fn load_inputs(config: &EtlConfig, csv: &CsvOptions) -> Result<(Dataset, Dataset)> {
    let orders = io_utils::read_dataset(&config.raw_orders, csv)
        .with_context(|| format!("Loading orders from {:?}", config.raw_orders))?;
    let users = io_utils::read_dataset(&config.raw_users, csv)
        .with_context(|| format!("Loading users from {:?}", config.raw_users))?;
    Ok((orders, users))
}

pub fn validate_inputs(
    orders_raw: &Dataset,
    users: &Dataset,
    options: &PipelineOptions,
) -> Result<()> {
    require_columns(orders_raw, ORDER_COLUMNS)?;
    require_columns(users, USER_COLUMNS)?;
    assert_non_empty(orders_raw, "orders_raw")?;
    assert_non_empty(users, "users")?;
    assert_unique_key(users, JOIN_KEY, false).map_err(user_key_violation)?;
    if options.require_unique_order_id {
        assert_unique_key(orders_raw, "order_id", false)?;
    }
    Ok(())
}

/// Reports duplicate user ids as a many-to-one cardinality failure on the
/// users side. Null user ids stay a key violation.
fn user_key_violation(err: ValidationError) -> ValidationError {
    match err {
        ValidationError::Uniqueness {
            key,
            violation: KeyViolation::Duplicate,
            rows,
        } => ValidationError::JoinCardinality {
            key,
            validation: JoinValidation::ManyToOne,
            side: JoinSide::Right,
            duplicate_rows: rows,
        },
        other => other,
    }
}

/// Adds `status_clean` and the `__isna` flags to schema-enforced orders.
pub fn clean_orders(orders_typed: &Dataset) -> Result<Dataset> {
    let status = orders_typed.column("status")?;
    let status_clean =
        apply_mapping(&normalize_text(status), &status_mapping()).renamed("status_clean");
    let orders = orders_typed.with_column(status_clean)?;
    add_missing_flags(&orders, MISSING_FLAG_COLUMNS)
}

pub fn check_ranges(orders: &Dataset) -> Result<()> {
    assert_in_range(orders.column("amount")?, Some(0.0), None, "amount")?;
    assert_in_range(orders.column("quantity")?, Some(0.0), None, "quantity")?;
    Ok(())
}

pub fn transform(
    orders_raw: &Dataset,
    users: &Dataset,
    options: &PipelineOptions,
) -> Result<TransformOutput> {
    validate_inputs(orders_raw, users, options)?;

    let orders_typed = enforce_schema(orders_raw)?;
    let orders = clean_orders(&orders_typed)?;
    if options.check_ranges {
        check_ranges(&orders)?;
    }

    let users_clean = users.with_column(cast_to_string(users.column(JOIN_KEY)?))?;

    let orders = parse_datetime(&orders, "created_at", true)?;
    let orders = add_time_parts(&orders, "created_at")?;
    debug!(
        "Orders cleaned: {} row(s), {} unparseable created_at value(s)",
        orders.row_count(),
        orders.column("created_at")?.null_count()
    );

    let user_columns = appended_column_names(&orders, &users_clean, JOIN_KEY);
    let mut analytics = left_join(&orders, &users_clean, JOIN_KEY, JoinValidation::ManyToOne)
        .context("Joining users onto orders")?;
    let amount_winsor = winsorize(analytics.column("amount")?, WINSOR_LO, WINSOR_HI)?;
    analytics.set_column(amount_winsor.renamed("amount_winsor"))?;
    let analytics = add_outlier_flag(&analytics, "amount", OUTLIER_K)?;

    Ok(TransformOutput {
        orders_typed,
        users: users_clean,
        analytics,
        user_columns,
    })
}

/// Analytics table without the columns the join appended from the users side.
pub fn orders_clean_projection(analytics: &Dataset, user_columns: &[String]) -> Dataset {
    let user_side = user_columns.iter().map(String::as_str).collect::<Vec<_>>();
    analytics.drop_columns(&user_side)
}

pub fn load_outputs(output: &TransformOutput, config: &EtlConfig) -> Result<()> {
    let TransformOutput {
        analytics,
        users,
        user_columns,
        ..
    } = output;
    io_utils::write_dataset(analytics, &config.out_analytics)
        .context("Writing analytics table")?;
    io_utils::write_dataset(users, &config.out_users).context("Writing users table")?;
    let orders_clean = orders_clean_projection(analytics, user_columns);
    io_utils::write_dataset(&orders_clean, &config.out_orders_clean)
        .context("Writing cleaned orders")?;
    info!(
        "Wrote analytics ({} rows), users ({} rows) and orders_clean to {:?}",
        analytics.row_count(),
        users.row_count(),
        config.out_analytics.parent().unwrap_or(config.root.as_path())
    );
    Ok(())
}

pub fn write_missingness_report(entries: &[MissingnessEntry], path: &Path) -> Result<()> {
    let table = report::missingness_dataset(entries)?;
    io_utils::write_dataset(&table, path)
        .with_context(|| format!("Writing missingness report to {path:?}"))?;
    info!("Wrote missingness report: {path:?}");
    Ok(())
}

pub fn write_run_meta(
    config: &EtlConfig,
    orders_raw: &Dataset,
    users: &Dataset,
    analytics: &Dataset,
) -> Result<RunMeta> {
    let meta = RunMeta::compute(config, orders_raw, users, analytics);
    io_utils::write_json(&meta, &config.run_meta)
        .with_context(|| format!("Writing run metadata to {:?}", config.run_meta))?;
    Ok(meta)
}

pub fn run_etl(config: &EtlConfig, options: &PipelineOptions) -> Result<RunMeta> {
    info!("Starting ETL run under {:?}", config.root);

    let (orders_raw, users) = load_inputs(config, &options.csv)?;
    info!(
        "Loaded {} order(s), {} user(s)",
        orders_raw.row_count(),
        users.row_count()
    );

    let output = transform(&orders_raw, &users, options)?;
    info!(
        "Transformed to {} analytics row(s)",
        output.analytics.row_count()
    );

    load_outputs(&output, config)?;
    write_missingness_report(
        &report::missingness_report(&output.orders_typed),
        &config.missingness_report,
    )?;
    let meta = write_run_meta(config, &orders_raw, &users, &output.analytics)?;
    info!(
        "ETL completed: country match rate {:.3}, {} missing created_at",
        meta.country_match_rate, meta.missing_created_at
    );
    Ok(meta)
}

/// Validates, cleans and range-checks orders without joining or parsing time.
pub fn clean(config: &EtlConfig, options: &PipelineOptions) -> Result<Dataset> {
    let (orders_raw, users) = load_inputs(config, &options.csv)?;
    info!(
        "Rows: orders_raw={}, users={}",
        orders_raw.row_count(),
        users.row_count()
    );
    require_columns(&orders_raw, ORDER_COLUMNS)?;
    require_columns(&users, USER_COLUMNS)?;
    assert_non_empty(&orders_raw, "orders_raw")?;
    assert_non_empty(&users, "users")?;

    let orders_typed = enforce_schema(&orders_raw)?;
    write_missingness_report(
        &report::missingness_report(&orders_typed),
        &config.missingness_report,
    )?;

    let orders_clean = clean_orders(&orders_typed)?;
    check_ranges(&orders_clean)?;

    io_utils::write_dataset(&orders_clean, &config.out_orders_clean)
        .context("Writing cleaned orders")?;
    io_utils::write_dataset(&users, &config.out_users).context("Writing users table")?;
    info!(
        "Wrote processed outputs to {:?}",
        config.out_orders_clean.parent().unwrap_or(config.root.as_path())
    );
    Ok(orders_clean)
}

/// Copies raw inputs into the processed area untouched.
pub fn stage_raw(config: &EtlConfig, options: &PipelineOptions) -> Result<()> {
    let (orders, users) = load_inputs(config, &options.csv)?;
    let staged_orders = config.staged_orders();
    io_utils::write_dataset(&orders, &staged_orders).context("Staging orders")?;
    io_utils::write_dataset(&users, &config.out_users).context("Staging users")?;
    info!(
        "Staged {} order(s) to {:?} and {} user(s) to {:?}",
        orders.row_count(),
        staged_orders,
        users.row_count(),
        config.out_users
    );
    Ok(())
}
