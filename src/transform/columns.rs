//! Schema coercion and missing-value flags.
//!
//! Coercion follows a "coerce, don't crash" rule: a cell that cannot be read
//! as the target type becomes null. Only structural problems (an absent
//! column) produce errors.

use anyhow::{Context, Result};

use crate::data::{Column, ColumnType, Dataset, Value};

/// Renders every non-null value as text.
pub fn cast_to_string(series: &Column) -> Column {
    let values = series
        .values
        .iter()
        .map(|cell| match cell {
            Some(Value::String(s)) => Some(Value::String(s.clone())),
            Some(other) => Some(Value::String(other.as_display())),
            None => None,
        })
        .collect();
    Column::new(series.name.clone(), ColumnType::String, values)
}

pub fn to_float(series: &Column) -> Column {
    let values = series
        .values
        .iter()
        .map(|cell| cell.as_ref().and_then(coerce_float).map(Value::Float))
        .collect();
    Column::new(series.name.clone(), ColumnType::Float, values)
}

pub fn to_integer(series: &Column) -> Column {
    let values = series
        .values
        .iter()
        .map(|cell| cell.as_ref().and_then(coerce_integer).map(Value::Integer))
        .collect();
    Column::new(series.name.clone(), ColumnType::Integer, values)
}

fn coerce_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Float(f) => *f,
        Value::Integer(i) => *i as f64,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (!parsed.is_nan()).then_some(parsed)
}

fn coerce_integer(value: &Value) -> Option<i64> {
    if let Value::Integer(i) = value {
        return Some(*i);
    }
    if let Value::String(s) = value
        && let Ok(parsed) = s.trim().parse::<i64>()
    {
        return Some(parsed);
    }
    let float = coerce_float(value)?;
    let in_range = float.is_finite() && float >= i64::MIN as f64 && float <= i64::MAX as f64;
    (in_range && float.fract() == 0.0).then_some(float as i64)
}

/// Casts the order columns: ids to text, `amount` to float, `quantity` to integer.
///
/// Applying it to its own output is a no-op.
pub fn enforce_schema(orders: &Dataset) -> Result<Dataset> {
    let order_id = orders.column("order_id").context("Enforcing orders schema")?;
    let user_id = orders.column("user_id").context("Enforcing orders schema")?;
    let amount = orders.column("amount").context("Enforcing orders schema")?;
    let quantity = orders.column("quantity").context("Enforcing orders schema")?;
    orders.with_columns([
        cast_to_string(order_id),
        cast_to_string(user_id),
        to_float(amount),
        to_integer(quantity),
    ])
}

/// Adds a boolean `{column}__isna` column per name, true where the source is null.
pub fn add_missing_flags(dataset: &Dataset, columns: &[&str]) -> Result<Dataset> {
    let flags = columns
        .iter()
        .map(|name| {
            let source = dataset
                .column(name)
                .with_context(|| format!("Flagging missing values in '{name}'"))?;
            let values = source
                .values
                .iter()
                .map(|cell| Some(Value::Boolean(cell.is_none())))
                .collect();
            Ok(Column::new(
                format!("{name}__isna"),
                ColumnType::Boolean,
                values,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    dataset.with_columns(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_coercion_accepts_integral_floats_only() {
        assert_eq!(coerce_integer(&Value::String("2.0".into())), Some(2));
        assert_eq!(coerce_integer(&Value::String(" 7 ".into())), Some(7));
        assert_eq!(coerce_integer(&Value::String("2.5".into())), None);
        assert_eq!(coerce_integer(&Value::String("inf".into())), None);
        assert_eq!(coerce_integer(&Value::Float(3.0)), Some(3));
    }

    #[test]
    fn float_coercion_turns_text_nan_into_null() {
        assert_eq!(coerce_float(&Value::String("NaN".into())), None);
        assert_eq!(coerce_float(&Value::String("1e3".into())), Some(1000.0));
        assert_eq!(coerce_float(&Value::String("abc".into())), None);
    }

    #[test]
    fn cast_to_string_renders_numbers() {
        let column = Column::new(
            "user_id",
            ColumnType::Integer,
            vec![Some(Value::Integer(7)), None],
        );
        let cast = cast_to_string(&column);
        assert_eq!(cast.data_type, ColumnType::String);
        assert_eq!(cast.values, vec![Some(Value::String("7".into())), None]);
    }
}
