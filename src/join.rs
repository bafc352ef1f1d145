use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::debug;

use crate::{
    data::{Column, Dataset, Value, ValueKey},
    error::ValidationError,
};

/// Declared cardinality between left and right join keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinValidation {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl JoinValidation {
    fn requires_unique_left(self) -> bool {
        matches!(self, JoinValidation::OneToOne | JoinValidation::OneToMany)
    }

    fn requires_unique_right(self) -> bool {
        matches!(self, JoinValidation::OneToOne | JoinValidation::ManyToOne)
    }
}

impl fmt::Display for JoinValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JoinValidation::OneToOne => "one_to_one",
            JoinValidation::OneToMany => "one_to_many",
            JoinValidation::ManyToOne => "many_to_one",
            JoinValidation::ManyToMany => "many_to_many",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

impl fmt::Display for JoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinSide::Left => f.write_str("left"),
            JoinSide::Right => f.write_str("right"),
        }
    }
}

/// Left join of `right` onto `left` by the shared column `on`.
///
/// Every left row is kept in its original order. Right columns other than the
/// key are appended; unmatched rows get nulls there. Null keys never match,
/// and keys match only when they are the same [`Value`] variant with the same text.
/// The cardinality declared in `validation` is checked before any row is
/// assembled, so a violation never yields a fanned-out table.
pub fn left_join(
    left: &Dataset,
    right: &Dataset,
    on: &str,
    validation: JoinValidation,
) -> Result<Dataset> {
    let left_key = left
        .column(on)
        .with_context(|| format!("Resolving join key '{on}' on the left"))?;
    let right_key = right
        .column(on)
        .with_context(|| format!("Resolving join key '{on}' on the right"))?;

    let right_lookup = build_right_lookup(right_key);

    if validation.requires_unique_right() {
        let duplicate_rows = right_lookup
            .values()
            .filter(|rows| rows.len() > 1)
            .map(Vec::len)
            .sum::<usize>();
        ensure_unique(on, validation, JoinSide::Right, duplicate_rows)?;
    }
    if validation.requires_unique_left() {
        let duplicate_rows = left_key
            .values
            .iter()
            .flatten()
            .map(Value::key)
            .counts()
            .into_values()
            .filter(|count| *count > 1)
            .sum::<usize>();
        ensure_unique(on, validation, JoinSide::Left, duplicate_rows)?;
    }

    let mut left_rows = Vec::with_capacity(left.row_count());
    let mut right_rows = Vec::with_capacity(left.row_count());
    let mut matched_rows = 0usize;
    for (row_idx, cell) in left_key.values.iter().enumerate() {
        let bucket = cell
            .as_ref()
            .and_then(|key| right_lookup.get(&key.key()));
        match bucket {
            Some(matches) => {
                matched_rows += 1;
                for right_idx in matches {
                    left_rows.push(Some(row_idx));
                    right_rows.push(Some(*right_idx));
                }
            }
            None => {
                left_rows.push(Some(row_idx));
                right_rows.push(None);
            }
        }
    }

    let mut columns = left
        .columns()
        .iter()
        .map(|column| column.take(&left_rows))
        .collect::<Vec<_>>();
    for (column, name) in build_right_columns(left, right, on) {
        columns.push(column.take(&right_rows).renamed(name));
    }
    debug!(
        "Joined on '{on}': {} output row(s), {} of {} left row(s) matched",
        left_rows.len(),
        matched_rows,
        left.row_count()
    );
    Dataset::new(columns)
}

fn ensure_unique(
    key: &str,
    validation: JoinValidation,
    side: JoinSide,
    duplicate_rows: usize,
) -> Result<(), ValidationError> {
    if duplicate_rows == 0 {
        return Ok(());
    }
    Err(ValidationError::JoinCardinality {
        key: key.to_string(),
        validation,
        side,
        duplicate_rows,
    })
}

fn build_right_lookup(key: &Column) -> HashMap<ValueKey, Vec<usize>> {
    let mut map: HashMap<ValueKey, Vec<usize>> = HashMap::new();
    for (row_idx, cell) in key.values.iter().enumerate() {
        if let Some(value) = cell {
            map.entry(value.key()).or_default().push(row_idx);
        }
    }
    map
}

/// Output names [`left_join`] gives the right-side columns it appends, in order.
pub fn appended_column_names(left: &Dataset, right: &Dataset, on: &str) -> Vec<String> {
    build_right_columns(left, right, on)
        .into_iter()
        .map(|(_, name)| name)
        .collect()
}

/// Right-side columns to append with their output names; clashing names are
/// renamed `right_{name}_{n}`.
fn build_right_columns<'a>(
    left: &Dataset,
    right: &'a Dataset,
    on: &str,
) -> Vec<(&'a Column, String)> {
    let mut seen: HashSet<String> = left.column_names().into_iter().map(String::from).collect();
    let mut out = Vec::new();
    for column in right.columns() {
        if column.name == on {
            continue;
        }
        let mut candidate = column.name.clone();
        let mut counter = 1usize;
        while seen.contains(&candidate) {
            candidate = format!("right_{}_{counter}", column.name);
            counter += 1;
        }
        seen.insert(candidate.clone());
        out.push((column, candidate));
    }
    out
}
