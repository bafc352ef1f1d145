//! In-memory typed tables.
//!
//! A [`Dataset`] is an ordered set of equally long [`Column`]s. Every cell is an
//! `Option<Value>`; `None` is the null marker that flows through coercion,
//! parsing and joins. Datasets are cheap to reason about rather than cheap to
//! copy: transforms take `&Dataset` and return a fresh one.

use std::{fmt, mem};

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tokens read as null when loading raw text.
pub const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "<NA>",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Timestamp,
}

impl ColumnType {
    pub fn is_temporal(self) -> bool {
        matches!(self, ColumnType::DateTime | ColumnType::Timestamp)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Timestamp => "timestamp",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
}

/// Hashable identity of a [`Value`]: the variant plus its rendered text.
pub type ValueKey = (mem::Discriminant<Value>, String);

impl Value {
    /// Keys of different variants never compare equal, so `Integer(1)` and
    /// `String("1")` are distinct keys.
    pub fn key(&self) -> ValueKey {
        (mem::discriminant(self), self.as_display())
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
    pub values: Vec<Option<Value>>,
}

impl Column {
    pub fn new(
        name: impl Into<String>,
        data_type: ColumnType,
        values: Vec<Option<Value>>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            values,
        }
    }

    /// Builds a text column; `None` entries become nulls.
    pub fn from_strings<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|v| v.map(|s| Value::String(s.into())))
            .collect();
        Self::new(name, ColumnType::String, values)
    }

    pub fn from_floats<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let values = values.into_iter().map(|v| v.map(Value::Float)).collect();
        Self::new(name, ColumnType::Float, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row).and_then(|v| v.as_ref())
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Gathers rows by position; `None` positions produce nulls.
    pub fn take(&self, rows: &[Option<usize>]) -> Column {
        let values = rows
            .iter()
            .map(|row| row.and_then(|idx| self.values.get(idx).cloned().flatten()))
            .collect();
        Column::new(self.name.clone(), self.data_type, values)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut dataset = Dataset::default();
        for column in columns {
            if dataset.has_column(&column.name) {
                bail!("Duplicate column '{}'", column.name);
            }
            dataset.set_column(column)?;
        }
        Ok(dataset)
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| anyhow!("Column '{name}' not found in dataset"))
    }

    /// Replaces a same-named column in place or appends a new one.
    pub fn set_column(&mut self, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            bail!(
                "Column '{}' has {} row(s) but dataset has {}",
                column.name,
                column.len(),
                self.row_count()
            );
        }
        match self.column_index(&column.name) {
            Some(idx) => self.columns[idx] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    pub fn with_column(&self, column: Column) -> Result<Dataset> {
        self.with_columns([column])
    }

    pub fn with_columns<I>(&self, columns: I) -> Result<Dataset>
    where
        I: IntoIterator<Item = Column>,
    {
        let mut out = self.clone();
        for column in columns {
            out.set_column(column)?;
        }
        Ok(out)
    }

    /// Drops the named columns; names that are absent are ignored.
    pub fn drop_columns(&self, names: &[&str]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.name.as_str()))
            .cloned()
            .collect();
        Dataset { columns }
    }

    /// Renders row `idx` as display strings, nulls as empty cells.
    pub fn display_row(&self, idx: usize) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.get(idx).map(Value::as_display).unwrap_or_default())
            .collect()
    }
}

pub fn is_na_token(raw: &str) -> bool {
    raw.is_empty() || NA_TOKENS.contains(&raw)
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d.%m.%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}
