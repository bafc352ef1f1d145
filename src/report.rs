//! Data-quality summaries for a run: the per-column missingness report and
//! the run metadata record.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    config::EtlConfig,
    data::{Column, ColumnType, Dataset, Value},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessEntry {
    pub column: String,
    pub n_missing: usize,
    pub p_missing: f64,
}

/// Null count and null fraction per column, highest fraction first.
///
/// Ties keep the dataset's column order. An empty dataset reports `0.0`.
pub fn missingness_report(dataset: &Dataset) -> Vec<MissingnessEntry> {
    let rows = dataset.row_count();
    let mut entries = dataset
        .columns()
        .iter()
        .map(|column| {
            let n_missing = column.null_count();
            MissingnessEntry {
                column: column.name.clone(),
                n_missing,
                p_missing: null_fraction(n_missing, rows),
            }
        })
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| b.p_missing.total_cmp(&a.p_missing));
    entries
}

fn null_fraction(n_missing: usize, rows: usize) -> f64 {
    if rows == 0 {
        0.0
    } else {
        n_missing as f64 / rows as f64
    }
}

/// The report as a three-column table, ready for the CSV writer.
pub fn missingness_dataset(entries: &[MissingnessEntry]) -> Result<Dataset> {
    let columns = vec![
        Column::from_strings("column", entries.iter().map(|e| Some(e.column.clone()))),
        Column::new(
            "n_missing",
            ColumnType::Integer,
            entries
                .iter()
                .map(|e| Some(Value::Integer(e.n_missing as i64)))
                .collect(),
        ),
        Column::from_floats("p_missing", entries.iter().map(|e| Some(e.p_missing))),
    ];
    Dataset::new(columns)
}

pub fn render_rows(entries: &[MissingnessEntry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|e| {
            vec![
                e.column.clone(),
                e.n_missing.to_string(),
                format!("{:.4}", e.p_missing),
            ]
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub rows_in_orders_raw: usize,
    pub rows_in_users: usize,
    pub rows_out_analytics: usize,
    pub missing_created_at: usize,
    pub country_match_rate: f64,
    pub config: EtlConfig,
}

impl RunMeta {
    pub fn compute(
        config: &EtlConfig,
        orders_raw: &Dataset,
        users: &Dataset,
        analytics: &Dataset,
    ) -> Self {
        let missing_created_at = analytics
            .column("created_at")
            .map(Column::null_count)
            .unwrap_or(0);
        let country_match_rate = analytics
            .column("country")
            .map(|country| {
                let rows = analytics.row_count();
                round3(1.0 - null_fraction(country.null_count(), rows))
            })
            .unwrap_or(0.0);
        Self {
            rows_in_orders_raw: orders_raw.row_count(),
            rows_in_users: users.row_count(),
            rows_out_analytics: analytics.row_count(),
            missing_created_at,
            country_match_rate,
            config: config.clone(),
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
