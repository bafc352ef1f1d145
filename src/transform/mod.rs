//! Pure column transforms.
//!
//! Every function here takes a dataset or column by reference and returns a
//! new one; inputs are never modified.

pub mod columns;
pub mod outliers;
pub mod string_ops;
pub mod temporal;

pub use columns::{add_missing_flags, cast_to_string, enforce_schema};
pub use outliers::{add_outlier_flag, iqr_bounds, quantile, winsorize};
pub use string_ops::{apply_mapping, normalize_text};
pub use temporal::{add_time_parts, parse_datetime};
