use std::{borrow::Cow, collections::HashMap, sync::OnceLock};

use regex::Regex;

use crate::data::{Column, ColumnType, Value};

static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();

fn whitespace_run() -> &'static Regex {
    WHITESPACE_RUN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern compiles"))
}

/// Full case folds that `to_lowercase` leaves alone or maps to a non-folded form.
const FULL_FOLDS: &[(char, &str)] = &[
    ('ß', "ss"),
    ('ẞ', "ss"),
    ('ſ', "s"),
    ('ς', "σ"),
    ('ﬀ', "ff"),
    ('ﬁ', "fi"),
    ('ﬂ', "fl"),
    ('ﬃ', "ffi"),
    ('ﬄ', "ffl"),
    ('ﬅ', "st"),
    ('ﬆ', "st"),
];

fn full_fold(ch: char) -> Option<&'static str> {
    FULL_FOLDS
        .iter()
        .find(|(from, _)| *from == ch)
        .map(|(_, to)| *to)
}

/// Case-folds for caseless comparison, reusing the original string when nothing changes.
///
/// This is lowercase plus the common full folds (`ß` to `ss`, final sigma,
/// latin ligatures), so `"STRASSE"` and `"Straße"` fold alike.
pub fn fold_case(input: &str) -> Cow<'_, str> {
    if input
        .chars()
        .all(|ch| !ch.is_uppercase() && full_fold(ch).is_none())
    {
        return Cow::Borrowed(input);
    }
    let mut folded = String::with_capacity(input.len());
    for ch in input.chars() {
        match full_fold(ch) {
            Some(replacement) => folded.push_str(replacement),
            None => folded.extend(ch.to_lowercase()),
        }
    }
    Cow::Owned(folded)
}

/// Collapses every whitespace run (spaces, tabs, newlines) into a single space.
pub fn collapse_whitespace(input: &str) -> Cow<'_, str> {
    let has_run = input
        .chars()
        .zip(input.chars().skip(1))
        .any(|(a, b)| a.is_whitespace() && b.is_whitespace());
    let has_odd_space = input.chars().any(|ch| ch.is_whitespace() && ch != ' ');
    if has_run || has_odd_space {
        whitespace_run().replace_all(input, " ")
    } else {
        Cow::Borrowed(input)
    }
}

/// Trim, case-fold, and collapse internal whitespace.
pub fn normalize_str(input: &str) -> Cow<'_, str> {
    match fold_case(input.trim()) {
        Cow::Borrowed(lowered) => collapse_whitespace(lowered),
        Cow::Owned(lowered) => Cow::Owned(collapse_whitespace(&lowered).into_owned()),
    }
}

/// Normalizes every value of `series` as text; nulls stay null.
///
/// Non-text values are rendered as text first, so the result is always a
/// string column.
pub fn normalize_text(series: &Column) -> Column {
    let values = series
        .values
        .iter()
        .map(|cell| {
            cell.as_ref().map(|value| {
                let normalized = match value {
                    Value::String(s) => normalize_str(s).into_owned(),
                    other => normalize_str(&other.as_display()).into_owned(),
                };
                Value::String(normalized)
            })
        })
        .collect();
    Column::new(series.name.clone(), ColumnType::String, values)
}

/// Replaces text values found in `mapping`; everything else, nulls included, passes through.
pub fn apply_mapping(series: &Column, mapping: &HashMap<String, String>) -> Column {
    let values = series
        .values
        .iter()
        .map(|cell| match cell {
            Some(Value::String(s)) => Some(Value::String(
                mapping.get(s).cloned().unwrap_or_else(|| s.clone()),
            )),
            other => other.clone(),
        })
        .collect();
    Column::new(series.name.clone(), series.data_type, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_case_borrows_when_unchanged() {
        assert!(matches!(fold_case("paid"), Cow::Borrowed(_)));
        assert_eq!(fold_case("PaId"), "paid");
    }

    #[test]
    fn fold_case_applies_full_folds() {
        assert_eq!(fold_case("STRASSE Straße"), "strasse strasse");
        assert_eq!(fold_case("ẞ"), "ss");
        assert_eq!(fold_case("ΟΔΟΣ"), "οδοσ");
        assert_eq!(fold_case("ﬁle"), "file");
    }

    #[test]
    fn collapse_whitespace_handles_tabs_and_newlines() {
        assert_eq!(collapse_whitespace("a\tb"), "a b");
        assert_eq!(collapse_whitespace("a \n  b"), "a b");
        assert!(matches!(collapse_whitespace("a b"), Cow::Borrowed(_)));
    }

    #[test]
    fn normalize_str_trims_folds_and_collapses() {
        assert_eq!(normalize_str(" Paid  \n"), "paid");
        assert_eq!(normalize_str("  REFUNDED   In  Full "), "refunded in full");
    }

    #[test]
    fn apply_mapping_keeps_unmapped_and_null_values() {
        let mapping = HashMap::from([("refunded".to_string(), "refund".to_string())]);
        let series = Column::from_strings("status", [Some("refunded"), Some("pending"), None]);
        let mapped = apply_mapping(&series, &mapping);
        assert_eq!(
            mapped.values,
            vec![
                Some(Value::String("refund".into())),
                Some(Value::String("pending".into())),
                None
            ]
        );
    }
}
