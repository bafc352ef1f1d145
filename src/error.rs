//! Business-rule violations raised by validators and the join.
//!
//! These are the only failures the pipeline treats as data errors; anything
//! else (I/O, malformed CSV) surfaces as a plain `anyhow::Error` with context.
//! Callers holding an `anyhow::Error` can recover the variant with
//! `err.downcast_ref::<ValidationError>()`.

use std::fmt;

use thiserror::Error;

use crate::join::{JoinSide, JoinValidation};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("{name} has 0 rows")]
    EmptyDataset { name: String },

    #[error("Key column '{key}' {violation}: {rows} row(s) affected")]
    Uniqueness {
        key: String,
        violation: KeyViolation,
        rows: usize,
    },

    #[error("{name} {bound}: {count} value(s) out of range")]
    Range {
        name: String,
        bound: RangeBound,
        count: usize,
    },

    #[error(
        "Join on '{key}' declared {validation} but {side} keys are not unique: {duplicate_rows} duplicate row(s)"
    )]
    JoinCardinality {
        key: String,
        validation: JoinValidation,
        side: JoinSide,
        duplicate_rows: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyViolation {
    Null,
    Duplicate,
}

impl fmt::Display for KeyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyViolation::Null => f.write_str("contains null values"),
            KeyViolation::Duplicate => f.write_str("is not unique"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeBound {
    Below(f64),
    Above(f64),
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeBound::Below(lo) => write!(f, "below {lo}"),
            RangeBound::Above(hi) => write!(f, "above {hi}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_every_missing_column() {
        let err = ValidationError::Schema {
            missing: vec!["amount".into(), "status".into()],
        };
        assert_eq!(err.to_string(), "Missing columns: amount, status");
    }

    #[test]
    fn cardinality_error_names_side_and_declaration() {
        let err = ValidationError::JoinCardinality {
            key: "user_id".into(),
            validation: JoinValidation::ManyToOne,
            side: JoinSide::Right,
            duplicate_rows: 2,
        };
        assert_eq!(
            err.to_string(),
            "Join on 'user_id' declared many_to_one but right keys are not unique: 2 duplicate row(s)"
        );
    }

    #[test]
    fn range_error_formats_bound() {
        let err = ValidationError::Range {
            name: "amount".into(),
            bound: RangeBound::Below(0.0),
            count: 3,
        };
        assert_eq!(err.to_string(), "amount below 0: 3 value(s) out of range");
    }
}
