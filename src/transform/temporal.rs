use anyhow::{Result, bail};
use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::data::{Column, ColumnType, Dataset, Value, parse_naive_date, parse_naive_datetime};

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"];

/// Parses one raw cell. `None` means the text is not a recognisable timestamp.
///
/// With `utc` set, offset-bearing values are converted to UTC and naive values
/// are taken to already be UTC. Without it, offsets are dropped and the local
/// wall-clock time is kept.
pub fn parse_timestamp(raw: &str, utc: bool) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(aware) = parse_with_offset(trimmed) {
        return Some(if utc {
            Value::Timestamp(aware.with_timezone(&Utc))
        } else {
            Value::DateTime(aware.naive_local())
        });
    }
    let naive = parse_naive_datetime(trimmed)
        .or_else(|_| parse_naive_date(trimmed).map(|d| d.and_time(NaiveTime::MIN)))
        .ok()?;
    Some(localize(naive, utc))
}

fn parse_with_offset(value: &str) -> Option<DateTime<chrono::FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
}

fn localize(naive: NaiveDateTime, utc: bool) -> Value {
    if utc {
        Value::Timestamp(naive.and_utc())
    } else {
        Value::DateTime(naive)
    }
}

fn coerce_timestamp(value: &Value, utc: bool) -> Option<Value> {
    match value {
        Value::String(s) => parse_timestamp(s, utc),
        Value::Timestamp(ts) if utc => Some(Value::Timestamp(*ts)),
        Value::Timestamp(ts) => Some(Value::DateTime(ts.naive_utc())),
        Value::DateTime(dt) => Some(localize(*dt, utc)),
        Value::Date(d) => Some(localize(d.and_time(NaiveTime::MIN), utc)),
        _ => None,
    }
}

/// Replaces `column` with parsed timestamps; unparseable cells become null.
pub fn parse_datetime(dataset: &Dataset, column: &str, utc: bool) -> Result<Dataset> {
    let source = dataset.column(column)?;
    let values = source
        .values
        .iter()
        .map(|cell| cell.as_ref().and_then(|v| coerce_timestamp(v, utc)))
        .collect();
    let data_type = if utc {
        ColumnType::Timestamp
    } else {
        ColumnType::DateTime
    };
    dataset.with_column(Column::new(column, data_type, values))
}

fn wall_clock(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(ts.naive_utc()),
        Value::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

/// Adds `date`, `year`, `month` (`YYYY-MM`), `dow` and `hour` derived from `ts_column`.
///
/// Null timestamps give nulls in all five columns.
pub fn add_time_parts(dataset: &Dataset, ts_column: &str) -> Result<Dataset> {
    let source = dataset.column(ts_column)?;
    if !source.data_type.is_temporal() {
        bail!(
            "Column '{ts_column}' is {} and must be parsed as a timestamp first",
            source.data_type
        );
    }
    let stamps = source
        .values
        .iter()
        .map(|cell| cell.as_ref().and_then(wall_clock))
        .collect::<Vec<_>>();
    dataset.with_columns([
        time_part(&stamps, "date", ColumnType::Date, |ts| Value::Date(ts.date())),
        time_part(&stamps, "year", ColumnType::Integer, |ts| {
            Value::Integer(i64::from(ts.year()))
        }),
        time_part(&stamps, "month", ColumnType::String, |ts| {
            Value::String(ts.format("%Y-%m").to_string())
        }),
        time_part(&stamps, "dow", ColumnType::String, |ts| {
            Value::String(ts.format("%A").to_string())
        }),
        time_part(&stamps, "hour", ColumnType::Integer, |ts| {
            Value::Integer(i64::from(ts.hour()))
        }),
    ])
}

fn time_part<F>(
    stamps: &[Option<NaiveDateTime>],
    name: &str,
    data_type: ColumnType,
    extract: F,
) -> Column
where
    F: Fn(&NaiveDateTime) -> Value,
{
    let values = stamps.iter().map(|ts| ts.as_ref().map(&extract)).collect();
    Column::new(name, data_type, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn offsets_are_normalised_to_utc() {
        let parsed = parse_timestamp("2024-03-01T23:30:00-02:00", true).unwrap();
        assert_eq!(
            parsed,
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, 2, 1, 30, 0).unwrap())
        );
    }

    #[test]
    fn zulu_suffix_with_space_separator_parses() {
        let parsed = parse_timestamp("2024-03-01 10:00:00Z", true).unwrap();
        assert_eq!(
            parsed,
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn naive_values_are_taken_as_utc() {
        let parsed = parse_timestamp("2024-03-01 10:15", true).unwrap();
        assert_eq!(
            parsed,
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap())
        );
    }

    #[test]
    fn date_only_values_land_on_midnight() {
        let parsed = parse_timestamp("2024-03-01", true).unwrap();
        assert_eq!(
            parsed,
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn local_time_is_kept_without_utc() {
        let parsed = parse_timestamp("2024-03-01T23:30:00-02:00", false).unwrap();
        let expected =
            NaiveDateTime::parse_from_str("2024-03-01 23:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(parsed, Value::DateTime(expected));
    }

    #[test]
    fn garbage_is_null() {
        assert_eq!(parse_timestamp("not a date", true), None);
        assert_eq!(parse_timestamp("2024-13-45", true), None);
        assert_eq!(parse_timestamp("   ", true), None);
    }
}
