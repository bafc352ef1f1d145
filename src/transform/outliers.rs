//! Quantile-based outlier detection and winsorization.
//!
//! Quantiles use linear interpolation between closest ranks: for `n` sorted
//! values the `q` quantile sits at position `(n - 1) * q`.

use anyhow::{Context, Result, ensure};

use crate::data::{Column, ColumnType, Dataset, Value};

/// Sorted non-null numeric values of `series`.
fn sorted_values(series: &Column) -> Vec<f64> {
    let mut values = series
        .values
        .iter()
        .flatten()
        .filter_map(Value::as_f64)
        .filter(|v| !v.is_nan())
        .collect::<Vec<_>>();
    values.sort_by(f64::total_cmp);
    values
}

/// Interpolated quantile of already sorted values; `None` when `sorted` is empty.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    let (a, b) = (sorted[lower], sorted[upper]);
    Some((a + (b - a) * fraction).max(a.min(b)).min(a.max(b)))
}

/// `(q1 - k * iqr, q3 + k * iqr)`, or `None` when the series has no values.
pub fn iqr_bounds(series: &Column, k: f64) -> Option<(f64, f64)> {
    let sorted = sorted_values(series);
    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - k * iqr, q3 + k * iqr))
}

/// Clips values to the `lo` and `hi` quantiles of the non-null distribution.
///
/// Nulls stay null. The result is always a float column.
pub fn winsorize(series: &Column, lo: f64, hi: f64) -> Result<Column> {
    ensure!(
        (0.0..=1.0).contains(&lo) && (0.0..=1.0).contains(&hi) && lo <= hi,
        "Winsorize quantiles must satisfy 0 <= lo <= hi <= 1 (got {lo}, {hi})"
    );
    let sorted = sorted_values(series);
    let bounds = quantile(&sorted, lo).zip(quantile(&sorted, hi));
    let values = series
        .values
        .iter()
        .map(|cell| {
            let value = cell.as_ref().and_then(Value::as_f64)?;
            let clipped = match bounds {
                Some((floor, ceiling)) => value.max(floor).min(ceiling),
                None => value,
            };
            Some(Value::Float(clipped))
        })
        .collect();
    Ok(Column::new(series.name.clone(), ColumnType::Float, values))
}

/// Adds `{column}__is_outlier`: true when the value lies outside the IQR fences.
///
/// Nulls are never outliers, and a column without values flags every row false.
pub fn add_outlier_flag(dataset: &Dataset, column: &str, k: f64) -> Result<Dataset> {
    let source = dataset
        .column(column)
        .with_context(|| format!("Flagging outliers in '{column}'"))?;
    let bounds = iqr_bounds(source, k);
    let values = source
        .values
        .iter()
        .map(|cell| {
            let outside = match (cell.as_ref().and_then(Value::as_f64), bounds) {
                (Some(value), Some((lo, hi))) => value < lo || value > hi,
                _ => false,
            };
            Some(Value::Boolean(outside))
        })
        .collect();
    dataset.with_column(Column::new(
        format!("{column}__is_outlier"),
        ColumnType::Boolean,
        values,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_between_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert_eq!(quantile(&sorted, 0.25), Some(2.25));
        assert_eq!(quantile(&sorted, 0.75), Some(4.75));
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 1.0), Some(100.0));
    }

    #[test]
    fn quantile_of_single_value_is_that_value() {
        assert_eq!(quantile(&[7.0], 0.99), Some(7.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn iqr_bounds_match_hand_computed_fences() {
        let series = Column::from_floats(
            "amount",
            [Some(1.0), Some(2.0), None, Some(3.0), Some(4.0), Some(5.0), Some(100.0)],
        );
        assert_eq!(iqr_bounds(&series, 1.5), Some((-1.5, 8.5)));
    }

    #[test]
    fn iqr_bounds_of_all_null_series_is_none() {
        let series = Column::from_floats("amount", [None, None]);
        assert_eq!(iqr_bounds(&series, 1.5), None);
    }

    #[test]
    fn winsorize_rejects_inverted_quantiles() {
        let series = Column::from_floats("amount", [Some(1.0)]);
        assert!(winsorize(&series, 0.9, 0.1).is_err());
    }
}
