//! Fail-fast precondition checks.
//!
//! Each validator inspects one dataset (or one column) and returns
//! [`ValidationError`] on the first violated rule. They have no side effects,
//! so callers pick which ones to run and in which order.

use itertools::Itertools;

use crate::{
    data::{Column, Dataset, Value},
    error::{KeyViolation, RangeBound, ValidationError},
};

/// Fails listing every name in `names` that is absent from `dataset`.
pub fn require_columns(dataset: &Dataset, names: &[&str]) -> Result<(), ValidationError> {
    let missing = names
        .iter()
        .filter(|name| !dataset.has_column(name))
        .map(|name| name.to_string())
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Schema { missing })
    }
}

/// `name` only labels the error message.
pub fn assert_non_empty(dataset: &Dataset, name: &str) -> Result<(), ValidationError> {
    if dataset.row_count() == 0 {
        return Err(ValidationError::EmptyDataset {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Checks `key` for nulls (unless `allow_na`) and for repeated non-null values.
///
/// The duplicate count is the number of rows that belong to any duplicate
/// group, so two rows sharing `"u1"` report 2, not 1. Values of different
/// variants (`Integer(1)`, `String("1")`) are distinct.
pub fn assert_unique_key(
    dataset: &Dataset,
    key: &str,
    allow_na: bool,
) -> Result<(), ValidationError> {
    let column = dataset
        .columns()
        .iter()
        .find(|c| c.name == key)
        .ok_or_else(|| ValidationError::Schema {
            missing: vec![key.to_string()],
        })?;

    if !allow_na {
        let nulls = column.null_count();
        if nulls > 0 {
            return Err(ValidationError::Uniqueness {
                key: key.to_string(),
                violation: KeyViolation::Null,
                rows: nulls,
            });
        }
    }

    let duplicate_rows = duplicate_row_count(column);
    if duplicate_rows > 0 {
        return Err(ValidationError::Uniqueness {
            key: key.to_string(),
            violation: KeyViolation::Duplicate,
            rows: duplicate_rows,
        });
    }
    Ok(())
}

pub(crate) fn duplicate_row_count(column: &Column) -> usize {
    column
        .values
        .iter()
        .flatten()
        .map(Value::key)
        .counts()
        .into_values()
        .filter(|count| *count > 1)
        .sum()
}

/// Null and non-numeric cells are skipped; only numeric values are compared.
pub fn assert_in_range(
    series: &Column,
    lo: Option<f64>,
    hi: Option<f64>,
    name: &str,
) -> Result<(), ValidationError> {
    let numeric = series
        .values
        .iter()
        .flatten()
        .filter_map(Value::as_f64)
        .collect::<Vec<_>>();

    if let Some(lo) = lo {
        let count = numeric.iter().filter(|v| **v < lo).count();
        if count > 0 {
            return Err(ValidationError::Range {
                name: name.to_string(),
                bound: RangeBound::Below(lo),
                count,
            });
        }
    }
    if let Some(hi) = hi {
        let count = numeric.iter().filter(|v| **v > hi).count();
        if count > 0 {
            return Err(ValidationError::Range {
                name: name.to_string(),
                bound: RangeBound::Above(hi),
                count,
            });
        }
    }
    Ok(())
}
